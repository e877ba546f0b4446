use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mockall::mock;
use serde_json::{Value, json};
use watchkeep_contracts::backend::KeyValueBackend;
use watchkeep_contracts::metadata::{
    LookupError, MetadataLookup, MetadataSearch,
};
use watchkeep_core::backend::MemoryBackend;
use watchkeep_core::scheduler::QueuedScheduler;
use watchkeep_core::watched::{
    Reconciler, WATCHED_STORE_KEY, WatchedStore,
};
use watchkeep_model::prelude::*;

mock! {
    pub Metadata {}

    #[async_trait]
    impl MetadataSearch for Metadata {
        async fn search(
            &self,
            query: &SearchQuery,
        ) -> Result<Vec<SearchHit>, LookupError>;
    }

    #[async_trait]
    impl MetadataLookup for Metadata {
        async fn get_by_id(
            &self,
            request: &LookupRequest,
        ) -> Result<Option<DetailedMeta>, LookupError>;
    }
}

fn hit(id: &str, title: &str, year: &str, media_type: MediaType) -> SearchHit {
    SearchHit {
        id: id.into(),
        title: title.into(),
        year: year.into(),
        media_type,
    }
}

fn movie_meta(id: &str, title: &str) -> DetailedMeta {
    CanonicalMeta {
        id: id.into(),
        title: title.into(),
        year: Some("2009".into()),
        detail: MetaDetail::Movie,
    }
    .into()
}

fn season(id: &str, number: u32, episodes: &[&str]) -> SeasonData {
    SeasonData {
        id: id.into(),
        number,
        title: format!("Season {number}"),
        episodes: episodes
            .iter()
            .zip(1..)
            .map(|(id, number)| EpisodeSummary {
                id: (*id).into(),
                number,
                title: String::new(),
            })
            .collect(),
    }
}

fn show_meta(season_data: SeasonData) -> DetailedMeta {
    CanonicalMeta {
        id: "show-1".into(),
        title: "Show".into(),
        year: Some("2010".into()),
        detail: MetaDetail::Series(SeriesDetail {
            seasons: vec![
                SeasonSummary {
                    id: "season-a".into(),
                    number: 1,
                    title: "Season 1".into(),
                },
                SeasonSummary {
                    id: "season-b".into(),
                    number: 2,
                    title: "Season 2".into(),
                },
            ],
            season_data,
        }),
    }
    .into()
}

/// "Up" (movie, id 14160) and "Show" (series, id show-1, two seasons).
fn catalog() -> MockMetadata {
    let mut metadata = MockMetadata::new();
    metadata.expect_search().returning(|query| {
        Ok(match query.title.as_str() {
            "Up" => vec![
                hit("99", "Up", "2015", MediaType::Movie),
                hit("14160", "Up", "2009", MediaType::Movie),
            ],
            "Show" => vec![hit("show-1", "Show", "2010", MediaType::Series)],
            _ => Vec::new(),
        })
    });
    metadata.expect_get_by_id().returning(|request| {
        Ok(match (request.id.as_str(), request.season_id.as_deref()) {
            ("14160", _) => Some(movie_meta("14160", "Up")),
            ("show-1", None | Some("season-a")) => {
                Some(show_meta(season("season-a", 1, &["a1", "a2"])))
            }
            ("show-1", Some("season-b")) => {
                Some(show_meta(season("season-b", 2, &["b1", "b2", "b3"])))
            }
            _ => None,
        })
    });
    metadata
}

fn legacy_movie(media_id: u64, title: &str, year: &str) -> Value {
    json!({
        "mediaId": media_id,
        "mediaType": "movie",
        "percentage": 40,
        "progress": 1200,
        "providerId": "legacy-provider",
        "title": title,
        "year": year
    })
}

fn legacy_episode(season: u32, episode: u32, progress: f64) -> Value {
    json!({
        "mediaId": 2,
        "mediaType": "series",
        "percentage": 10,
        "progress": progress,
        "providerId": "legacy-provider",
        "title": "Show",
        "year": "2010-2012",
        "seasonId": season,
        "episodeId": episode
    })
}

fn legacy(items: Vec<Value>) -> LegacyData {
    serde_json::from_value(json!({ "items": items })).unwrap()
}

fn at_version_one(items: Vec<Value>) -> Arc<MemoryBackend> {
    let blob = json!({ "--version": 1, "items": items });
    Arc::new(MemoryBackend::with_entry(
        WATCHED_STORE_KEY,
        serde_json::to_vec(&blob).unwrap(),
    ))
}

fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

fn watched_store(
    metadata: MockMetadata,
    backend: &Arc<MemoryBackend>,
    scheduler: &Arc<QueuedScheduler>,
) -> WatchedStore {
    WatchedStore::with_reconciler(
        WATCHED_STORE_KEY,
        Reconciler::new(Arc::new(metadata)).with_clock(fixed_clock),
        backend.clone(),
        scheduler.clone(),
    )
    .unwrap()
}

#[tokio::test]
async fn legacy_movie_is_recovered_in_the_background() {
    let backend = at_version_one(vec![legacy_movie(1, "Up", "2009-05-01")]);
    let scheduler = Arc::new(QueuedScheduler::new());
    let store = watched_store(catalog(), &backend, &scheduler);

    let loaded = store.load().unwrap();

    assert!(loaded.is_empty(), "structural result is empty");
    let bytes = backend.get(WATCHED_STORE_KEY).unwrap().unwrap();
    let persisted: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(persisted, json!({ "--version": 2, "items": [] }));
    assert_eq!(scheduler.pending(), 1);

    scheduler.run_pending().await;

    let recovered = store.load().unwrap();
    assert_eq!(recovered.len(), 1);
    let item = &recovered.items[0];
    assert_eq!(item.item.meta.id, "14160");
    assert!(item.item.series.is_none());
    assert_eq!(item.progress, 1200.0);
    assert_eq!(item.percentage, 40.0);
    assert_eq!(item.watched_at, fixed_clock());
}

#[tokio::test]
async fn malformed_entries_do_not_discard_the_rest_of_the_history() {
    let backend = at_version_one(vec![
        legacy_movie(1, "Up", "2009-05-01"),
        json!({
            "mediaId": 2,
            "mediaType": "series",
            "percentage": 10,
            "progress": 42,
            "providerId": null,
            "title": "Show",
            "year": "2010-2012",
            "seasonId": "1",
            "episodeId": "2"
        }),
        json!({ "mediaId": 3, "mediaType": "movie", "title": null }),
    ]);
    let scheduler = Arc::new(QueuedScheduler::new());
    let store = watched_store(catalog(), &backend, &scheduler);

    assert!(store.load().unwrap().is_empty());
    assert_eq!(scheduler.pending(), 1, "history reaches the reconciler");

    scheduler.run_pending().await;

    let recovered = store.load().unwrap();
    let ids: Vec<_> = recovered
        .items
        .iter()
        .map(|item| item.item.meta.id.as_str())
        .collect();
    assert_eq!(ids, vec!["14160", "show-1"]);
    let series = recovered.items[1].item.series.as_ref().unwrap();
    assert_eq!((series.season, series.episode), (1, 2));
    assert_eq!(series.episode_id, "a2");
    assert_eq!(recovered.items[1].progress, 42.0);
}

#[tokio::test]
async fn series_entries_resolve_positionally_and_dedup() {
    let metadata = Arc::new(catalog());
    let reconciler = Reconciler::new(metadata).with_clock(fixed_clock);
    let history = legacy(vec![
        legacy_episode(1, 2, 10.0),
        legacy_episode(2, 3, 30.0),
        legacy_episode(1, 2, 20.0),
        legacy_episode(5, 1, 50.0),
        legacy_episode(2, 9, 90.0),
    ]);

    let (rebuilt, report) =
        reconciler.rebuild(&history, &WatchedStoreData::default()).await;

    let coordinates: Vec<_> = rebuilt
        .items
        .iter()
        .map(|item| {
            let series = item.item.series.as_ref().unwrap();
            (
                series.season,
                series.episode,
                series.season_id.as_str(),
                series.episode_id.as_str(),
                item.progress,
            )
        })
        .collect();
    assert_eq!(
        coordinates,
        vec![(1, 2, "season-a", "a2", 10.0), (2, 3, "season-b", "b3", 30.0)]
    );
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.dropped, 2, "season 5 and episode 9 do not exist");
    assert_eq!(report.resolved_seasons, 2);
}

#[tokio::test]
async fn second_run_writes_nothing() {
    let backend = Arc::new(MemoryBackend::new());
    let scheduler = Arc::new(QueuedScheduler::new());
    let ticks = Arc::new(AtomicI64::new(0));
    let clock = {
        let ticks = Arc::clone(&ticks);
        move || {
            let tick = ticks.fetch_add(1, Ordering::SeqCst);
            DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(tick)
        }
    };
    let reconciler = Reconciler::new(Arc::new(catalog())).with_clock(clock);
    let store = WatchedStore::with_reconciler(
        WATCHED_STORE_KEY,
        reconciler.clone(),
        backend.clone(),
        scheduler.clone(),
    )
    .unwrap();
    let history = legacy(vec![
        legacy_movie(1, "Up", "2009"),
        legacy_episode(1, 1, 5.0),
    ]);

    let first = reconciler
        .reconcile(&history, store.versioned())
        .await
        .unwrap();
    let writes_after_first = backend.writes();
    let second = reconciler
        .reconcile(&history, store.versioned())
        .await
        .unwrap();

    assert!(first.written);
    assert_eq!(first.recovered, 2);
    assert!(!second.written);
    assert_eq!(backend.writes(), writes_after_first);
    assert_eq!(ticks.load(Ordering::SeqCst), 2, "clock read once per run");
}

#[tokio::test]
async fn lookup_misses_are_excluded_without_aborting() {
    let mut metadata = MockMetadata::new();
    metadata.expect_search().returning(|query| match query.title.as_str() {
        "Up" => Ok(vec![hit("14160", "Up", "2009", MediaType::Movie)]),
        "Far Off" => Ok(vec![hit("5", "Far Off", "2015", MediaType::Movie)]),
        "Gone" => Ok(vec![hit("6", "Gone", "2009", MediaType::Movie)]),
        _ => Err(LookupError::Request("connection reset".into())),
    });
    metadata.expect_get_by_id().returning(|request| {
        Ok((request.id == "14160").then(|| movie_meta("14160", "Up")))
    });
    let reconciler =
        Reconciler::new(Arc::new(metadata)).with_clock(fixed_clock);
    let history = legacy(vec![
        legacy_movie(1, "Far Off", "2009"),
        legacy_movie(2, "Broken", "2009"),
        legacy_movie(3, "Gone", "2009"),
        legacy_movie(4, "Up", "2009-05-01"),
        legacy_movie(5, "Undated", "unknown"),
    ]);

    let (rebuilt, report) =
        reconciler.rebuild(&history, &WatchedStoreData::default()).await;

    assert_eq!(rebuilt.len(), 1);
    assert_eq!(rebuilt.items[0].item.meta.id, "14160");
    assert_eq!(report.unique_media, 5);
    assert_eq!(report.matched_media, 2);
    assert_eq!(report.dropped, 4);
}

#[tokio::test]
async fn nothing_recovered_leaves_store_untouched() {
    let mut metadata = MockMetadata::new();
    metadata.expect_search().returning(|_| Ok(Vec::new()));
    metadata.expect_get_by_id().never();
    let backend = at_version_one(vec![legacy_movie(1, "Nothing", "2001")]);
    let scheduler = Arc::new(QueuedScheduler::new());
    let store = watched_store(metadata, &backend, &scheduler);

    store.load().unwrap();
    let writes = backend.writes();
    scheduler.run_pending().await;

    assert_eq!(backend.writes(), writes);
    assert!(store.load().unwrap().is_empty());
}

#[tokio::test]
async fn empty_legacy_history_defers_nothing() {
    let backend = at_version_one(Vec::new());
    let scheduler = Arc::new(QueuedScheduler::new());
    let store = watched_store(MockMetadata::new(), &backend, &scheduler);

    assert!(store.load().unwrap().is_empty());
    assert_eq!(scheduler.pending(), 0);
}
