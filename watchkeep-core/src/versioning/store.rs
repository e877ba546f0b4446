use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use watchkeep_contracts::backend::KeyValueBackend;
use watchkeep_contracts::scheduler::TaskScheduler;

use crate::error::{MigrationError, Result, StoreError};

use super::chain::VersionChain;
use super::payload::{RawPayload, SchemaPayload};
use super::runner::{DeferredTask, MigrationRunner};

/// A version chain bound to one backend key.
///
/// Cloning is cheap; clones share the chain, backend and scheduler.
pub struct VersionedStore<P> {
    inner: Arc<StoreInner<P>>,
}

struct StoreInner<P> {
    key: String,
    chain: VersionChain<P>,
    backend: Arc<dyn KeyValueBackend>,
    scheduler: Arc<dyn TaskScheduler>,
}

impl<P> Clone for VersionedStore<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> fmt::Debug for VersionedStore<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedStore")
            .field("key", &self.inner.key)
            .field("latest_version", &self.inner.chain.latest())
            .finish()
    }
}

impl<P: SchemaPayload> VersionedStore<P> {
    pub fn new(
        key: impl Into<String>,
        chain: VersionChain<P>,
        backend: Arc<dyn KeyValueBackend>,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                key: key.into(),
                chain,
                backend,
                scheduler,
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn chain(&self) -> &VersionChain<P> {
        &self.inner.chain
    }

    pub fn latest_version(&self) -> u32 {
        self.inner.chain.latest()
    }

    /// Read the payload, walking it forward to the latest version.
    ///
    /// Absent or unreadable state yields the chain's fresh payload, persisted
    /// at the latest version. A successful walk is persisted before it is
    /// returned; work deferred by migration steps is handed to the scheduler
    /// only after that write and is never awaited here.
    pub fn load(&self) -> Result<P> {
        let latest = self.latest_version();
        let Some(raw) = self.read_raw()? else {
            return self.initialize();
        };

        if raw.version > latest {
            return Err(MigrationError::FutureVersion {
                stored: raw.version,
                latest,
            }
            .into());
        }

        let stored = raw.version;
        let payload = match raw.decode::<P>() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    target: "watchkeep::store",
                    key = %self.inner.key,
                    error = %err,
                    "stored payload unreadable; starting fresh"
                );
                return self.initialize();
            }
        };

        if stored == latest {
            return Ok(payload);
        }

        let outcome =
            MigrationRunner::new(&self.inner.chain).run(stored, payload)?;
        let applied = outcome.applied.clone();
        let (payload, deferred) = outcome.into_parts();

        self.write(&payload)?;
        info!(
            target: "watchkeep::store",
            key = %self.inner.key,
            from = stored,
            to = latest,
            steps = applied.len(),
            deferred = deferred.len(),
            "migrated stored payload"
        );

        self.dispatch(deferred);
        Ok(payload)
    }

    /// Replace the stored payload. Only latest-version payloads are accepted.
    pub fn save(&self, payload: &P) -> Result<()> {
        let latest = self.latest_version();
        if payload.version() != latest {
            return Err(StoreError::VersionMismatch {
                found: payload.version(),
                latest,
            });
        }
        self.write(payload)
    }

    /// Version tag currently persisted, without migrating.
    ///
    /// `None` when the key is absent or unreadable.
    pub fn stored_version(&self) -> Result<Option<u32>> {
        Ok(self.read_raw()?.map(|raw| raw.version))
    }

    fn read_raw(&self) -> Result<Option<RawPayload>> {
        let Some(bytes) = self.inner.backend.get(&self.inner.key)? else {
            return Ok(None);
        };

        match RawPayload::from_bytes(&bytes) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) => {
                warn!(
                    target: "watchkeep::store",
                    key = %self.inner.key,
                    error = %err,
                    "ignoring corrupt stored payload"
                );
                Ok(None)
            }
        }
    }

    fn initialize(&self) -> Result<P> {
        let fresh = self.inner.chain.create();
        self.write(&fresh)?;
        debug!(
            target: "watchkeep::store",
            key = %self.inner.key,
            version = self.latest_version(),
            "initialized fresh payload"
        );
        Ok(fresh)
    }

    fn write(&self, payload: &P) -> Result<()> {
        let bytes = RawPayload::encode(payload)?.to_bytes()?;
        self.inner.backend.set(&self.inner.key, &bytes)?;
        Ok(())
    }

    fn dispatch(&self, deferred: Vec<DeferredTask<P>>) {
        for task in deferred {
            self.inner.scheduler.schedule(task(self.clone()));
        }
    }
}
