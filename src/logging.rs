//! Tracing setup.
//!
//! Events go to the configured log file when there is one, and additionally to
//! stderr in verbose mode. Without either, nothing is written, which keeps the
//! animated spinner line intact.

use std::fs::OpenOptions;
use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::JobwatchError;

pub fn filter(directive: &str) -> Result<EnvFilter, JobwatchError> {
    EnvFilter::try_new(directive)
        .map_err(|e| JobwatchError::Config(format!("invalid log_level {directive:?}: {e}")))
}

pub fn init(directive: &str, log_file: Option<&Path>, verbose: bool) -> Result<(), JobwatchError> {
    let filter = filter(directive)?;

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
        }
        None => None,
    };
    let stderr_layer = verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| JobwatchError::Config(format!("logging already initialized: {e}")))
}
