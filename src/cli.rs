//! jobwatch command line, built on clap.
//!
//! Defines [`Cli`] with the [`Command`] subcommands and the global flags
//! (`--verbose`, `--log-file`, `--tick-ms`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// jobwatch — live terminal progress for running jobs.
#[derive(Debug, Parser)]
#[command(name = "jobwatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Stream logs to stderr and disable the spinner.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Append logs to this file (overrides `jobwatch.toml`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Polling interval in milliseconds (overrides `jobwatch.toml`).
    #[arg(long, global = true)]
    pub tick_ms: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Runs a scripted set of simulated jobs and watches them.
    Demo {
        /// Make the deploy job fail.
        #[arg(long)]
        fail: bool,

        /// Print every job's ticket as JSON once the display ends.
        #[arg(long)]
        json: bool,
    },
}
