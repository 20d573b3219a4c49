mod calendar;
mod cli;
mod commands;
mod config;
mod countdown;
mod form;
mod model;
mod notes;
mod session;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;
use log::debug;
use std::fs::OpenOptions;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    let config = config::load_config().unwrap_or_else(|err| {
        eprintln!("warning: {:#}", err);
        config::Config::default()
    });
    initialize_logger(&config, matches!(command, cli::Command::Tui));
    debug!("running {:?}", command);

    let store = args.store.or(config.store);
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::Status => commands::status(store),
        cli::Command::Set {
            date,
            time,
            message,
        } => commands::set(store, date, time, message),
        cli::Command::Calendar => commands::calendar(store),
        cli::Command::Note { date, text } => commands::note(store, date, text),
        cli::Command::Notes => commands::notes(store),
        cli::Command::Print { output } => commands::print(store, output),
        cli::Command::Reset { yes } => commands::reset(store, yes),
        cli::Command::Tui => commands::tui(store),
    }
}

/// The TUI owns the terminal, so its log goes to a file in the data dir.
fn initialize_logger(config: &config::Config, to_file: bool) {
    let env = env_logger::Env::new().filter_or("COUNTCAL_LOG", config.log_level.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    builder.format_timestamp_secs().format_module_path(true);

    if to_file {
        let file = storage::data_dir()
            .map_err(anyhow::Error::from)
            .and_then(|dir| {
                std::fs::create_dir_all(&dir)?;
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(dir.join("countcal.log"))?;
                Ok(file)
            });
        match file {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(_) => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }
    builder.init();
}
