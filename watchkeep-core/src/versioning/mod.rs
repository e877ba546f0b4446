//! Integer-versioned, single-key persisted state.
//!
//! A [`VersionChain`] lists every schema revision of a payload. A
//! [`VersionedStore`] binds that chain to one backend key and walks stored
//! payloads forward to the latest revision on every load. Migration steps may
//! hand work to a [`MigrationContext`] that only runs after the walk's result
//! has been persisted and returned.

pub mod chain;
pub mod payload;
pub mod runner;
pub mod store;

pub use chain::{
    Initializer, Migrator, SchemaVersion, VersionChain, VersionChainBuilder,
};
pub use payload::{RawPayload, SchemaPayload, VERSION_FIELD};
pub use runner::{MigrationContext, MigrationOutcome, MigrationRunner};
pub use store::VersionedStore;
