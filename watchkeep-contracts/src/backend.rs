use thiserror::Error;

/// Failure reading or writing a backend key.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The underlying storage failed.
    #[error("I/O error for key '{key}': {source}")]
    Io {
        /// Key being read or written.
        key: String,
        /// Error reported by the storage.
        #[source]
        source: std::io::Error,
    },

    /// The key cannot be represented by this backend.
    #[error("invalid key '{0}'")]
    InvalidKey(String),

    /// The backend cannot serve requests at all.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Single-key blob storage.
///
/// Calls are synchronous and carry no transaction semantics: `set` replaces
/// the whole value and concurrent writers race with last-write-wins.
pub trait KeyValueBackend: Send + Sync {
    /// Raw bytes stored under `key`, `None` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, bytes: &[u8]) -> Result<(), BackendError>;
}

impl<T: KeyValueBackend + ?Sized> KeyValueBackend for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, bytes: &[u8]) -> Result<(), BackendError> {
        (**self).set(key, bytes)
    }
}
