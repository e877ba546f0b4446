//! Trait surfaces for the collaborators the progress store talks to.
//!
//! The store itself only ever sees these contracts: a synchronous key-value
//! backend, the metadata search and by-id services, and a scheduler for work
//! that must stay off the load path.

/// Persistence of raw payload bytes
pub mod backend;
/// Title search and by-id metadata lookups
pub mod metadata;
/// Hand-off of deferred work to the host
pub mod scheduler;

/// Frequently used contract imports.
pub mod prelude {
    pub use super::backend::{BackendError, KeyValueBackend};
    pub use super::metadata::{
        LookupError, MetadataLookup, MetadataSearch, MetadataService,
    };
    pub use super::scheduler::{DeferredFuture, TaskScheduler};
}
