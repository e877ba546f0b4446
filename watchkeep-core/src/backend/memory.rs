use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use watchkeep_contracts::backend::{BackendError, KeyValueBackend};

/// Process-local backend. Counts writes so hosts can tell whether a job
/// touched the store.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, Vec<u8>>,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with `bytes` under `key`. Seeding is not counted
    /// as a write.
    pub fn with_entry(
        key: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let backend = Self::new();
        backend.entries.insert(key.into(), bytes.into());
        backend
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.remove(key).map(|(_, bytes)| bytes)
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, bytes: &[u8]) -> Result<(), BackendError> {
        self.entries.insert(key.to_string(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
