use crate::calendar::format_month;
use crate::form::parse_date;
use crate::model::day_key;
use crate::session::Session;
use crate::storage::{init_project_store, locate_store, StoreLocation};
use crate::ui;
use anyhow::{bail, Context, Result};
use chrono::Local;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

pub fn init() -> Result<()> {
    let location = init_project_store().context("creating project store")?;
    println!("Initialized store at {}", location.path.display());
    Ok(())
}

pub fn status(store: Option<PathBuf>) -> Result<()> {
    let session = start_session(store.as_deref())?;
    let now = Local::now().naive_local();
    println!("{}", session.remaining(now).display(&session.target().message));
    println!(
        "Target: {}{}",
        session.target().date.format("%Y-%m-%d %H:%M:%S"),
        if session.target_is_preset() { " (preset)" } else { "" }
    );
    Ok(())
}

pub fn set(store: Option<PathBuf>, date: String, time: String, message: String) -> Result<()> {
    let mut session = start_session(store.as_deref())?;
    let cfg = session.submit_form(&date, &time, &message)?;
    println!("Target set to {}", cfg.date.format("%Y-%m-%d %H:%M:%S"));
    let now = Local::now().naive_local();
    println!("{}", session.remaining(now).display(&cfg.message));
    Ok(())
}

pub fn calendar(store: Option<PathBuf>) -> Result<()> {
    let session = start_session(store.as_deref())?;
    let now = Local::now().naive_local();
    let grids = session.calendar(now);
    if grids.is_empty() {
        println!("Target date is in the past; nothing to show");
    }
    for grid in grids {
        println!("{}", format_month(&grid, session.note_book()));
    }
    Ok(())
}

pub fn note(store: Option<PathBuf>, date: String, text: String) -> Result<()> {
    let mut session = start_session(store.as_deref())?;
    let day = parse_date(&date)?;
    if session.add_note(day, &text)? {
        println!("Saved note for {}", day_key(day));
    } else {
        println!("Empty note, nothing saved");
    }
    Ok(())
}

pub fn notes(store: Option<PathBuf>) -> Result<()> {
    let session = start_session(store.as_deref())?;
    if session.note_book().is_empty() {
        println!("(no notes)");
    }
    for (day, content) in session.notes().list_notes() {
        println!("{}: {}", day, content);
    }
    Ok(())
}

pub fn print(store: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let session = start_session(store.as_deref())?;
    match output {
        Some(path) => {
            session
                .notes()
                .write_print_view(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} notes to {}", session.note_book().len(), path.display());
        }
        None => println!("{}", session.notes().print_view()),
    }
    Ok(())
}

pub fn reset(store: Option<PathBuf>, yes: bool) -> Result<()> {
    let mut session = start_session(store.as_deref())?;
    if !yes && !confirm("¿Queres borrar las notas? [y/N] ")? {
        println!("Reset canceled");
        return Ok(());
    }
    session.reset_notes()?;
    println!("Se han borrado las notas.");
    Ok(())
}

pub fn tui(store: Option<PathBuf>) -> Result<()> {
    let session = start_session(store.as_deref())?;
    ui::run(session)
}

pub fn resolve_location(store: Option<&Path>) -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    let location = locate_store(store, &cwd).context("locating store")?;
    Ok(location)
}

fn start_session(store: Option<&Path>) -> Result<Session> {
    let location = resolve_location(store)?;
    Ok(Session::start(location))
}

fn confirm(question: &str) -> Result<bool> {
    print!("{}", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "s" | "si" | "sí" => Ok(true),
        "" | "n" | "no" => Ok(false),
        other => bail!("unrecognized answer: {}", other),
    }
}
