//! CLI definitions for Tether.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tether CLI.
#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Thread-affine run loops with a cron scheduler")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to the user config dir, then built-in defaults)
    #[arg(short, long, env = "TETHER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the scheduler thread in foreground until Ctrl-C
    Run {
        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Parse a five-field cron expression and print the expanded sets
    Check {
        /// Cron expression, e.g. "*/15 9-17 * * mon-fri"
        expr: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}
