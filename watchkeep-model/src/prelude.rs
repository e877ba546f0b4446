//! Snapshot of the types surface used by the store and its hosts.
//! Prefer importing from this module instead of individual tree nodes.

pub use super::legacy::{LegacyData, LegacyItem, LegacyYear};
pub use super::media_type::MediaType;
pub use super::meta::{
    CanonicalMeta, DetailedMeta, EpisodeSummary, LookupRequest, MetaDetail,
    SearchHit, SearchQuery, SeasonData, SeasonSummary, SeriesDetail,
};
pub use super::watch::{
    WatchedItem, WatchedKey, WatchedMedia, WatchedSeries, WatchedStoreData,
};
