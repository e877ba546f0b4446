use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use crate::error::MigrationError;

use super::chain::VersionChain;
use super::payload::{RawPayload, SchemaPayload};
use super::store::VersionedStore;

/// Work requested by a migration step, started once the walk's result is
/// persisted.
pub type DeferredTask<P> =
    Box<dyn FnOnce(VersionedStore<P>) -> BoxFuture<'static, ()> + Send>;

/// Side channel handed to every migration step.
pub struct MigrationContext<P> {
    target: u32,
    deferred: Vec<DeferredTask<P>>,
}

impl<P> MigrationContext<P> {
    fn new() -> Self {
        Self {
            target: 0,
            deferred: Vec::new(),
        }
    }

    /// Version the running step produces.
    pub fn target_version(&self) -> u32 {
        self.target
    }

    /// Queue `task` to run off the load path with a handle to the store.
    ///
    /// The task is dropped if the walk fails or its result cannot be
    /// persisted.
    pub fn defer<F, Fut>(&mut self, task: F)
    where
        F: FnOnce(VersionedStore<P>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.deferred.push(Box::new(move |store| task(store).boxed()));
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }
}

impl<P> fmt::Debug for MigrationContext<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationContext")
            .field("target", &self.target)
            .field("deferred", &self.deferred.len())
            .finish()
    }
}

/// Result of a successful walk.
pub struct MigrationOutcome<P> {
    pub payload: P,
    /// Versions whose step ran, ascending.
    pub applied: Vec<u32>,
    pub(crate) deferred: Vec<DeferredTask<P>>,
}

impl<P> MigrationOutcome<P> {
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub(crate) fn into_parts(self) -> (P, Vec<DeferredTask<P>>) {
        (self.payload, self.deferred)
    }
}

impl<P: fmt::Debug> fmt::Debug for MigrationOutcome<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationOutcome")
            .field("payload", &self.payload)
            .field("applied", &self.applied)
            .field("deferred", &self.deferred.len())
            .finish()
    }
}

/// Walks a payload from its stored version up to the chain's latest.
#[derive(Debug)]
pub struct MigrationRunner<'a, P> {
    chain: &'a VersionChain<P>,
}

impl<'a, P: SchemaPayload> MigrationRunner<'a, P> {
    pub fn new(chain: &'a VersionChain<P>) -> Self {
        Self { chain }
    }

    /// Apply every step in `(stored, latest]` in ascending order.
    ///
    /// Each step receives the previous step's output. The first failing step
    /// aborts the walk and drops anything earlier steps deferred.
    pub fn run(
        &self,
        stored: u32,
        payload: P,
    ) -> Result<MigrationOutcome<P>, MigrationError> {
        let latest = self.chain.latest();
        if stored > latest {
            return Err(MigrationError::FutureVersion { stored, latest });
        }

        let mut context = MigrationContext::new();
        let mut current = payload;
        let mut applied = Vec::new();

        for descriptor in self.chain.pending(stored) {
            let target = descriptor.version();
            context.target = target;

            let from = current.version();
            current = match descriptor.migrator() {
                Some(migrate) => migrate(current, &mut context)?,
                None => reshape(target, current)?,
            };

            if current.version() != target {
                return Err(MigrationError::UnexpectedPayload {
                    version: target,
                    expected: target,
                    found: current.version(),
                });
            }

            debug!(
                target: "watchkeep::migration",
                from,
                to = target,
                "applied structural migration"
            );
            applied.push(target);
        }

        Ok(MigrationOutcome {
            payload: current,
            applied,
            deferred: context.deferred,
        })
    }
}

/// Steps without a migrator re-read the previous body under their own
/// version.
fn reshape<P: SchemaPayload>(
    target: u32,
    previous: P,
) -> Result<P, MigrationError> {
    let raw = RawPayload::encode(&previous).map_err(|source| {
        MigrationError::Reshape {
            version: target,
            source,
        }
    })?;
    P::decode(target, raw.body).map_err(|source| MigrationError::Reshape {
        version: target,
        source,
    })
}
