//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - apply: resolve the schedule and save it to Plex (default)
//! - preview: print the resolved listing
//! - show: list every parsed entry and its state

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// prerollr - Automate scheduling of pre-roll intros for Plex
#[derive(Parser, Debug)]
#[command(name = "prerollr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to pre-roll schedule file (default: ./preroll_schedules.yaml)
    #[arg(short, long, global = true)]
    pub schedule_path: Option<PathBuf>,

    /// Directory for the log file
    #[arg(short, long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Evaluate at this instant instead of now (YYYY-MM-DD[ HH:MM:SS], wildcards allowed)
    #[arg(long, global = true)]
    pub now: Option<String>,

    /// Play every active pre-roll instead of one at random
    #[arg(long, global = true)]
    pub play_all: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Resolve the schedule and save it to the Plex server
    Apply {
        /// Print the listing instead of saving it
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Print the resolved listing without contacting the server
    Preview,

    /// Show every parsed schedule entry
    Show {
        /// Emit entries as JSON
        #[arg(long)]
        json: bool,
    },
}
