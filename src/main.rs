mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use jobwatch::config::JobwatchConfig;
use jobwatch::ui::Outcome;
use jobwatch::{demo, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(outcome) if outcome.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    let mut config = JobwatchConfig::load()?;
    if let Some(path) = cli.log_file {
        config.log_file = Some(path);
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_ms = tick_ms;
    }

    logging::init(&config.log_level, config.log_file.as_deref(), cli.verbose)?;

    match cli.command {
        Command::Demo { fail, json } => demo::run(&config, cli.verbose, fail, json).await,
    }
}
