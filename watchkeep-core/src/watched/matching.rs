//! Pure helpers used to match flat history entries against search results.

use std::collections::HashSet;

use watchkeep_model::legacy::{LegacyData, LegacyItem, LegacyYear};
use watchkeep_model::meta::SearchHit;

/// Maximum distance, in years, between a recorded year and a search hit.
pub const YEAR_TOLERANCE: u32 = 1;

/// First entry per `media_id`, in input order.
pub fn dedup_by_media(items: &[LegacyItem]) -> Vec<&LegacyItem> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.media_id))
        .collect()
}

/// Leading year of a date or range string (`"2009-05-01"`, `"2009-2011"`).
pub fn year_prefix(raw: &str) -> Option<i32> {
    raw.split('-').next()?.trim().parse().ok()
}

/// Year to search with for a recorded release year.
pub fn search_year(year: &LegacyYear) -> Option<i32> {
    match year {
        LegacyYear::Number(year) => i32::try_from(*year).ok(),
        LegacyYear::Text(raw) => year_prefix(raw),
    }
}

pub fn years_close(a: i32, b: i32) -> bool {
    a.abs_diff(b) <= YEAR_TOLERANCE
}

/// First hit whose year lies within [`YEAR_TOLERANCE`] of `year`.
///
/// Hits with an unreadable year never match.
pub fn first_close_hit(hits: &[SearchHit], year: i32) -> Option<&SearchHit> {
    hits.iter().find(|hit| {
        year_prefix(&hit.year).is_some_and(|found| years_close(found, year))
    })
}

/// Distinct season numbers referenced by series entries of `media_id`, in
/// first-seen order.
pub fn referenced_seasons(legacy: &LegacyData, media_id: u64) -> Vec<u32> {
    let mut seen = HashSet::new();
    legacy
        .entries_for(media_id)
        .filter(|item| item.is_series())
        .filter_map(|item| item.season_id)
        .filter(|season| seen.insert(*season))
        .collect()
}
