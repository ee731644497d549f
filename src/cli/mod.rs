//! CLI argument parsing using clap 4.x derive macros

pub mod daemon;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Keeps a job-portal profile looking recently active to recruiters
///
/// Logs in on a daily schedule, touches the profile page and re-submits
/// the resume, headline and expected salary so the profile surfaces in
/// recency-sorted recruiter searches.
#[derive(Parser, Debug)]
#[command(name = "jobpulse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the config file (overrides the default search)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one update cycle now, with retries
    Run,

    /// Show schedule, next run time and update history
    Status,

    /// Run the scheduler loop until interrupted
    Daemon,

    /// Log in and report the profile identity without changing anything
    Info,

    /// Validate the configuration and report problems
    Validate,
}
