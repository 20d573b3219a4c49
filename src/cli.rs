use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "countcal",
    version,
    about = "Countdown to a target date with a day-notes calendar"
)]
pub struct Cli {
    /// Use this store file instead of the project/global one
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project store in the current directory
    Init,
    /// Print the countdown and message
    Status,
    /// Set the target date, time and message
    Set {
        /// Target date in YYYY-MM-DD format
        date: String,
        /// Target time in HH:MM format
        time: String,
        /// Message shown under the countdown
        #[arg(long, short = 'm', default_value = "")]
        message: String,
    },
    /// Print the calendar from today to the target date
    Calendar,
    /// Add or replace the note for a day
    Note {
        /// Day in YYYY-MM-DD format
        date: String,
        /// Note text (empty text leaves the day untouched)
        text: String,
    },
    /// List all notes
    Notes,
    /// Write the print view of all notes
    Print {
        /// Write to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Delete all notes
    Reset {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Launch the interactive TUI
    Tui,
}
