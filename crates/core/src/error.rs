use std::path::PathBuf;
use thiserror::Error;

/// Errors talking to the now-playing service
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The service task is gone
    #[error("now-playing service channel closed")]
    ChannelClosed,
}

/// Errors loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
