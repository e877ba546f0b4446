use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::trace;
use watchkeep_contracts::backend::{BackendError, KeyValueBackend};

/// One JSON file per key under a root directory.
///
/// Writes go to a temporary file in the same directory that is then renamed
/// over the target, so readers see either the old or the new blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryBackend {
    root: PathBuf,
}

impl DirectoryBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, BackendError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

fn validate_key(key: &str) -> Result<(), BackendError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(BackendError::InvalidKey(key.to_string()))
    }
}

fn io_error(key: &str, source: io::Error) -> BackendError {
    BackendError::Io {
        key: key.to_string(),
        source,
    }
}

impl KeyValueBackend for DirectoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(key, err)),
        }
    }

    fn set(&self, key: &str, bytes: &[u8]) -> Result<(), BackendError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).map_err(|err| io_error(key, err))?;

        let mut staged = NamedTempFile::new_in(&self.root)
            .map_err(|err| io_error(key, err))?;
        staged.write_all(bytes).map_err(|err| io_error(key, err))?;
        staged
            .as_file()
            .sync_all()
            .map_err(|err| io_error(key, err))?;
        staged
            .persist(&path)
            .map_err(|err| io_error(key, err.error))?;

        trace!(
            target: "watchkeep::backend",
            key,
            path = %path.display(),
            bytes = bytes.len(),
            "replaced stored blob"
        );
        Ok(())
    }
}
