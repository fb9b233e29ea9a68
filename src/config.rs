//! jobwatch configuration loaded from `jobwatch.toml`.
//!
//! [`JobwatchConfig`] holds every tunable. Keys missing from the file fall back
//! to defaults, and `JOBWATCH_LOG_FILE` takes precedence over the file's
//! `log_file`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::JobwatchError;
use crate::ui::SpinnerKind;

pub const CONFIG_FILE: &str = "jobwatch.toml";
pub const LOG_FILE_ENV: &str = "JOBWATCH_LOG_FILE";

#[derive(Debug, Clone, Deserialize)]
pub struct JobwatchConfig {
    /// File that receives log output; also named in the failure hint.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// `EnvFilter` directive, e.g. `"info"` or `"jobwatch=debug"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Polling interval in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Column count assumed when stdout is not a terminal.
    #[serde(default)]
    pub fallback_width: usize,

    #[serde(default)]
    pub spinner: SpinnerKind,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tick_ms() -> u64 {
    100
}

impl Default for JobwatchConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            log_level: default_log_level(),
            tick_ms: default_tick_ms(),
            fallback_width: 0,
            spinner: SpinnerKind::default(),
        }
    }
}

impl JobwatchConfig {
    /// Loads `jobwatch.toml` from the current directory, defaults if absent.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Path::new(CONFIG_FILE))?;

        if let Ok(path) = std::env::var(LOG_FILE_ENV)
            && !path.is_empty()
        {
            config.log_file = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str::<JobwatchConfig>(&contents)
            .map_err(JobwatchError::from)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
