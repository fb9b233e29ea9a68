use thiserror::Error;

use crate::job::RegistryError;

#[derive(Debug, Error)]
pub enum JobwatchError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
