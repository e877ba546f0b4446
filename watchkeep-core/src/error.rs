use thiserror::Error;
use watchkeep_contracts::backend::BackendError;

/// Malformed version chain. Raised while building a chain, never at runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("version chain has no versions")]
    EmptyChain,

    #[error("version chain must start at 0, found {found}")]
    MustStartAtZero { found: u32 },

    #[error("version {version} is declared twice")]
    Duplicate { version: u32 },

    #[error("version {found} is declared after version {previous}")]
    OutOfOrder { previous: u32, found: u32 },

    #[error("version {found} skips versions after {previous}")]
    Gap { previous: u32, found: u32 },

    #[error(
        "version {version} defines create(); only the latest version ({latest}) may"
    )]
    MisplacedCreate { version: u32, latest: u32 },

    #[error("latest version {latest} does not define create()")]
    MissingCreate { latest: u32 },
}

/// A structural migration step failed. Surfaced to the `load()` caller.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("migration to version {version} failed: {reason}")]
    Step { version: u32, reason: String },

    #[error(
        "migration to version {version} expected a version {expected} payload, got version {found}"
    )]
    UnexpectedPayload {
        version: u32,
        expected: u32,
        found: u32,
    },

    #[error(
        "stored version {stored} is newer than the latest known version {latest}"
    )]
    FutureVersion { stored: u32, latest: u32 },

    #[error("failed to reshape payload for version {version}: {source}")]
    Reshape {
        version: u32,
        #[source]
        source: serde_json::Error,
    },
}

impl MigrationError {
    pub fn step(version: u32, reason: impl Into<String>) -> Self {
        MigrationError::Step {
            version,
            reason: reason.into(),
        }
    }
}

/// Persisted bytes that cannot be read back.
///
/// Never surfaced: the store logs it and falls back to a fresh payload.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("stored bytes are not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("stored value is not a JSON object")]
    NotAnObject,

    #[error("version tag is not a non-negative integer: {0}")]
    InvalidVersionTag(String),

    #[error("stored body does not match version {version}: {source}")]
    Body {
        version: u32,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("payload for version {version} is not a JSON object")]
    NotAnObject { version: u32 },

    #[error(
        "cannot save a version {found} payload; the store is at version {latest}"
    )]
    VersionMismatch { found: u32, latest: u32 },
}

pub type Result<T> = std::result::Result<T, StoreError>;
