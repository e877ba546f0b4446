pub mod tmdb;
pub mod tmdb_types;

pub use tmdb::{ProviderError, TMDB_V3_BASE, TmdbMetadataService, TmdbSettings};
