//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sleeptrack - track how long and how well you sleep
#[derive(Parser, Debug)]
#[command(name = "sleeptrack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database file to use instead of the configured one
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start tracking tonight
    Start,

    /// Stop tracking tonight
    Stop,

    /// Show whether a night is being tracked
    Status,

    /// List tracked nights
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rate a night (0-5 or very-bad, poor, so-so, ok, good, excellent)
    Rate {
        /// Quality rating
        quality: String,

        /// Night to rate (defaults to the latest finished night)
        #[arg(short, long)]
        night: Option<i64>,
    },

    /// Delete all tracked nights
    Clear,
}
