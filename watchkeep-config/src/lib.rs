//! Configuration for watchkeep hosts.
//!
//! Settings come from an optional TOML or JSON file and are then overridden
//! by environment variables. Loading never touches the process environment
//! directly; callers hand the loader a snapshot so tests stay hermetic.
#![allow(missing_docs)]

pub mod error;
pub mod loader;
pub mod models;
pub mod util;

pub use error::ConfigLoadError;
pub use loader::{ConfigLoad, ConfigLoader};
pub use models::{Config, ConfigSource, StoreConfig, TmdbConfig};
