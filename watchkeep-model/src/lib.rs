//! Core data model definitions shared across watchkeep crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod error;
pub mod legacy;
pub mod media_type;
pub mod meta;
pub mod prelude;
pub mod watch;

// Intentionally curated re-exports for downstream consumers.
pub use error::{ModelError, Result as ModelResult};
pub use legacy::{LegacyData, LegacyItem, LegacyYear};
pub use media_type::MediaType;
pub use meta::{
    CanonicalMeta, DetailedMeta, EpisodeSummary, LookupRequest, MetaDetail,
    SearchHit, SearchQuery, SeasonData, SeasonSummary, SeriesDetail,
};
pub use watch::{
    WatchedItem, WatchedKey, WatchedMedia, WatchedSeries, WatchedStoreData,
};
