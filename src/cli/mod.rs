pub mod config;
pub mod format;
pub mod monitor;
pub mod query;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Index(#[from] crate::index::IndexError),

    #[error(transparent)]
    Monitor(#[from] crate::monitor::MonitorError),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("config file already exists at {0}; remove it first or use --stdout")]
    ConfigExists(std::path::PathBuf),

    #[error("cannot determine a home directory to write the config to; use --stdout")]
    NoHomeDir,
}
