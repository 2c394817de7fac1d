use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Config file '{0}' must contain a JSON object at the top level")]
    NotAnObject(PathBuf),

    #[error("Invalid config key '{0}'")]
    InvalidKey(String),

    #[error("Failed to serialize config value: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Error saving config to '{path}': {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}
