//! # Watchkeep Core
//!
//! Versioned persistence for watch progress. A store is bound to one backend
//! key and an ordered chain of schema versions; loading walks whatever was
//! persisted up to the latest version, persists the result and hands any
//! background work requested by the walk to a host scheduler.
//!
//! ## Architecture
//!
//! - [`versioning`]: the generic chain, migration runner and versioned store
//! - [`watched`]: the `video-progress` store, its schema history and the
//!   reconciler that recovers flat legacy history
//! - [`backend`]: in-memory and directory key-value backends
//! - [`scheduler`]: tokio-backed and manually drained task schedulers
//! - [`providers`]: the TMDB metadata adapter
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use watchkeep_core::backend::MemoryBackend;
//! use watchkeep_core::providers::{TmdbMetadataService, TmdbSettings};
//! use watchkeep_core::scheduler::TokioScheduler;
//! use watchkeep_core::watched::WatchedStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let tmdb = TmdbMetadataService::new(TmdbSettings::new("api-key")?);
//! let scheduler =
//!     Arc::new(TokioScheduler::try_current().ok_or("no tokio runtime")?);
//! let store = WatchedStore::open(
//!     Arc::new(tmdb),
//!     Arc::new(MemoryBackend::new()),
//!     scheduler.clone(),
//! )?;
//!
//! let progress = store.load()?;
//! println!("{} watched items", progress.len());
//!
//! scheduler.drain().await;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod backend;

/// Error types for chain construction, migration and persistence
pub mod error;

/// External metadata providers (TMDB integration)
pub mod providers;

pub mod scheduler;

/// Schema chains and the store that walks persisted payloads through them
pub mod versioning;

pub mod watched;

pub use error::{
    ConfigurationError, MigrationError, ParseError, Result, StoreError,
};
pub use versioning::{
    MigrationContext, MigrationRunner, SchemaPayload, SchemaVersion,
    VersionChain, VersionedStore,
};
pub use watched::{
    ReconcileReport, Reconciler, WATCHED_STORE_KEY, WatchedPayload,
    WatchedStore,
};

/// Frequently used store imports.
pub mod prelude {
    pub use crate::backend::{DirectoryBackend, MemoryBackend};
    pub use crate::error::{MigrationError, StoreError};
    pub use crate::scheduler::{QueuedScheduler, TokioScheduler};
    pub use crate::versioning::{
        SchemaPayload, SchemaVersion, VersionChain, VersionedStore,
    };
    pub use crate::watched::{WatchedPayload, WatchedStore};
    pub use watchkeep_contracts::prelude::*;
    pub use watchkeep_model::prelude::*;
}
