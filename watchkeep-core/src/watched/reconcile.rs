//! Background recovery of flat watch history into structured items.
//!
//! The job resolves every legacy title against the metadata service, rebuilds
//! the structured item list in legacy order and writes it only when it differs
//! from what the store already holds. Lookup failures never abort the job;
//! they only shrink the recovered list.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};
use watchkeep_contracts::metadata::MetadataService;
use watchkeep_model::legacy::{LegacyData, LegacyItem};
use watchkeep_model::media_type::MediaType;
use watchkeep_model::meta::{
    CanonicalMeta, LookupRequest, SearchHit, SearchQuery,
};
use watchkeep_model::watch::{
    WatchedItem, WatchedMedia, WatchedSeries, WatchedStoreData,
};

use crate::error::Result;
use crate::versioning::VersionedStore;

use super::WatchedPayload;
use super::matching::{
    dedup_by_media, first_close_hit, referenced_seasons, search_year,
};

/// Source of `watchedAt` timestamps for items that have none yet.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Counters for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub legacy_entries: usize,
    pub unique_media: usize,
    pub matched_media: usize,
    pub resolved_seasons: usize,
    pub recovered: usize,
    /// Entries excluded because their metadata could not be resolved.
    pub dropped: usize,
    /// Entries whose key was already taken by an earlier entry.
    pub duplicates: usize,
    pub written: bool,
}

/// Resolved metadata, per media and (for series) per season number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MetaSlot {
    media_id: u64,
    season: Option<u32>,
}

impl MetaSlot {
    fn title(media_id: u64) -> Self {
        Self {
            media_id,
            season: None,
        }
    }

    fn season(media_id: u64, season: u32) -> Self {
        Self {
            media_id,
            season: Some(season),
        }
    }
}

struct Matched {
    legacy: LegacyItem,
    hit: SearchHit,
}

struct SeasonLookup {
    slot: MetaSlot,
    request: LookupRequest,
}

#[derive(Clone)]
pub struct Reconciler {
    metadata: Arc<dyn MetadataService>,
    clock: Clock,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(metadata: Arc<dyn MetadataService>) -> Self {
        Self {
            metadata,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Deferred-task entry point. Outcomes are logged, never returned.
    pub async fn run(
        self,
        legacy: LegacyData,
        store: VersionedStore<WatchedPayload>,
    ) {
        match self.reconcile(&legacy, &store).await {
            Ok(report) => info!(
                target: "watchkeep::reconcile",
                key = store.key(),
                legacy_entries = report.legacy_entries,
                recovered = report.recovered,
                dropped = report.dropped,
                duplicates = report.duplicates,
                written = report.written,
                "legacy watch history reconciled"
            ),
            Err(err) => warn!(
                target: "watchkeep::reconcile",
                key = store.key(),
                error = %err,
                "legacy watch history reconciliation failed"
            ),
        }
    }

    /// Rebuild from `legacy` and commit when the result differs from the
    /// store's current items.
    pub async fn reconcile(
        &self,
        legacy: &LegacyData,
        store: &VersionedStore<WatchedPayload>,
    ) -> Result<ReconcileReport> {
        let current = store.load()?.into_current(store.latest_version())?;
        let (rebuilt, mut report) = self.rebuild(legacy, &current).await;

        if rebuilt.items == current.items {
            debug!(
                target: "watchkeep::reconcile",
                items = rebuilt.len(),
                "rebuilt items match stored items; nothing to write"
            );
            return Ok(report);
        }

        store.save(&WatchedPayload::V2(rebuilt))?;
        report.written = true;
        Ok(report)
    }

    /// Structured items recoverable from `legacy`, in legacy order.
    ///
    /// `current` only supplies `watched_at` for keys that already exist, so
    /// repeated runs produce identical output.
    pub async fn rebuild(
        &self,
        legacy: &LegacyData,
        current: &WatchedStoreData,
    ) -> (WatchedStoreData, ReconcileReport) {
        let unique = dedup_by_media(&legacy.items);
        let mut report = ReconcileReport {
            legacy_entries: legacy.items.len(),
            unique_media: unique.len(),
            ..ReconcileReport::default()
        };

        let searches = unique.into_iter().cloned().map(|legacy| {
            let metadata = Arc::clone(&self.metadata);
            async move {
                let hit = find_match(metadata.as_ref(), &legacy).await;
                hit.map(|hit| Matched { legacy, hit })
            }
        });
        let matched: Vec<Matched> =
            join_all(searches).await.into_iter().flatten().collect();
        report.matched_media = matched.len();

        let titles = join_all(matched.into_iter().map(|matched| {
            let metadata = Arc::clone(&self.metadata);
            let request =
                LookupRequest::title(matched.hit.media_type, &matched.hit.id);
            async move { (lookup(metadata.as_ref(), request).await, matched) }
        }))
        .await;

        let mut metas: HashMap<MetaSlot, CanonicalMeta> = HashMap::new();
        let mut season_lookups = Vec::new();
        for (meta, matched) in titles {
            let Some(meta) = meta else { continue };
            let media_id = matched.legacy.media_id;

            match matched.hit.media_type {
                MediaType::Movie => {
                    metas.insert(MetaSlot::title(media_id), meta);
                }
                MediaType::Series => season_lookups.extend(
                    season_requests(legacy, &matched, &meta),
                ),
            }
        }

        let seasons = join_all(season_lookups.into_iter().map(|season| {
            let metadata = Arc::clone(&self.metadata);
            async move {
                (season.slot, lookup(metadata.as_ref(), season.request).await)
            }
        }))
        .await;
        for (slot, meta) in seasons {
            if let Some(meta) = meta {
                report.resolved_seasons += 1;
                metas.insert(slot, meta);
            }
        }

        let now = (self.clock)();
        let mut rebuilt = WatchedStoreData::default();
        for entry in &legacy.items {
            let Some(mut item) = rebuild_entry(entry, &metas, now) else {
                report.dropped += 1;
                continue;
            };
            if let Some(existing) = current.get(&item.key()) {
                item.watched_at = existing.watched_at;
            }
            if !rebuilt.push_unique(item) {
                report.duplicates += 1;
            }
        }
        report.recovered = rebuilt.len();

        (rebuilt, report)
    }
}

async fn find_match(
    metadata: &dyn MetadataService,
    item: &LegacyItem,
) -> Option<SearchHit> {
    let Some(year) = search_year(&item.year) else {
        warn!(
            target: "watchkeep::reconcile",
            media_id = item.media_id,
            year = %item.year,
            "lookup miss: unreadable release year"
        );
        return None;
    };

    let query = SearchQuery {
        title: item.title.clone(),
        year,
        media_type: item.media_type,
    };
    let hits = match metadata.search(&query).await {
        Ok(hits) => hits,
        Err(err) => {
            warn!(
                target: "watchkeep::reconcile",
                media_id = item.media_id,
                title = %item.title,
                error = %err,
                "lookup miss: search failed"
            );
            return None;
        }
    };

    let hit = first_close_hit(&hits, year).cloned();
    if hit.is_none() {
        warn!(
            target: "watchkeep::reconcile",
            media_id = item.media_id,
            title = %item.title,
            year,
            candidates = hits.len(),
            "lookup miss: no result within a year of the recorded release"
        );
    }
    hit
}

async fn lookup(
    metadata: &dyn MetadataService,
    request: LookupRequest,
) -> Option<CanonicalMeta> {
    match metadata.get_by_id(&request).await {
        Ok(Some(detailed)) => Some(detailed.meta),
        Ok(None) => {
            warn!(
                target: "watchkeep::reconcile",
                id = %request.id,
                season_id = ?request.season_id,
                "lookup miss: unknown id"
            );
            None
        }
        Err(err) => {
            warn!(
                target: "watchkeep::reconcile",
                id = %request.id,
                season_id = ?request.season_id,
                error = %err,
                "lookup miss: by-id request failed"
            );
            None
        }
    }
}

/// Season fetches needed for one matched series, keyed by legacy season
/// number. Numbers past the show's season list are skipped.
fn season_requests(
    legacy: &LegacyData,
    matched: &Matched,
    show: &CanonicalMeta,
) -> Vec<SeasonLookup> {
    let media_id = matched.legacy.media_id;
    let Some(series) = show.series() else {
        warn!(
            target: "watchkeep::reconcile",
            media_id,
            id = %matched.hit.id,
            "structural mismatch: series lookup returned no season list"
        );
        return Vec::new();
    };

    referenced_seasons(legacy, media_id)
        .into_iter()
        .filter_map(|number| {
            let Some(season) = series.season(number) else {
                warn!(
                    target: "watchkeep::reconcile",
                    media_id,
                    season = number,
                    available = series.seasons.len(),
                    "structural mismatch: season out of range"
                );
                return None;
            };
            Some(SeasonLookup {
                slot: MetaSlot::season(media_id, number),
                request: LookupRequest::season(&matched.hit.id, &season.id),
            })
        })
        .collect()
}

fn rebuild_entry(
    entry: &LegacyItem,
    metas: &HashMap<MetaSlot, CanonicalMeta>,
    now: DateTime<Utc>,
) -> Option<WatchedItem> {
    let item = match entry.media_type {
        MediaType::Movie => WatchedMedia {
            meta: metas.get(&MetaSlot::title(entry.media_id))?.clone(),
            series: None,
        },
        MediaType::Series => series_media(entry, metas)?,
    };

    Some(WatchedItem {
        item,
        progress: entry.progress,
        percentage: entry.percentage,
        watched_at: now,
    })
}

fn series_media(
    entry: &LegacyItem,
    metas: &HashMap<MetaSlot, CanonicalMeta>,
) -> Option<WatchedMedia> {
    let (season, episode) = entry.season_id.zip(entry.episode_id)?;
    let meta = metas.get(&MetaSlot::season(entry.media_id, season))?;
    let season_data = meta.season_data()?;

    let Some(resolved) = season_data.episode(episode) else {
        warn!(
            target: "watchkeep::reconcile",
            media_id = entry.media_id,
            season,
            episode,
            available = season_data.episodes.len(),
            "structural mismatch: episode out of range"
        );
        return None;
    };

    Some(WatchedMedia {
        meta: meta.clone(),
        series: Some(WatchedSeries {
            season,
            episode,
            season_id: season_data.id.clone(),
            episode_id: resolved.id.clone(),
        }),
    })
}
