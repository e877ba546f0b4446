use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("invalid URL in {var}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("{var} must be a boolean, got '{value}'")]
    InvalidBool { var: &'static str, value: String },
    #[error(
        "store key '{0}' may only contain letters, digits, '-', '_' and '.'"
    )]
    InvalidStoreKey(String),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}
