//! The `video-progress` store and its schema history.
//!
//! | version | body                                         |
//! |---------|----------------------------------------------|
//! | 0       | pre-versioning data, never interpreted       |
//! | 1       | flat [`LegacyData`] history                  |
//! | 2       | structured [`WatchedStoreData`] items        |
//!
//! Moving to version 2 is the only step with background work: it returns an
//! empty item list immediately and defers a [`Reconciler`] run over the
//! version 1 history.

pub mod matching;
pub mod reconcile;

use std::sync::Arc;

use serde::Deserialize;
use serde::de::Error as _;
use serde_json::Value;
use tracing::warn;
use watchkeep_contracts::backend::KeyValueBackend;
use watchkeep_contracts::metadata::MetadataService;
use watchkeep_contracts::scheduler::TaskScheduler;
use watchkeep_model::legacy::{LegacyData, LegacyItem};
use watchkeep_model::watch::WatchedStoreData;

use crate::error::{ConfigurationError, MigrationError, Result, StoreError};
use crate::versioning::{
    MigrationContext, SchemaPayload, SchemaVersion, VersionChain,
    VersionedStore,
};

pub use reconcile::{Clock, ReconcileReport, Reconciler};

/// Backend key of the watch-progress store.
pub const WATCHED_STORE_KEY: &str = "video-progress";

pub const LATEST_WATCHED_VERSION: u32 = 2;

/// Watch-progress payload at any schema version.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchedPayload {
    V0(Value),
    V1(LegacyData),
    V2(WatchedStoreData),
}

impl WatchedPayload {
    /// Structured items, or a mismatch error for older revisions.
    pub fn into_current(self, latest: u32) -> Result<WatchedStoreData> {
        match self {
            WatchedPayload::V2(data) => Ok(data),
            other => Err(StoreError::VersionMismatch {
                found: other.version(),
                latest,
            }),
        }
    }
}

impl SchemaPayload for WatchedPayload {
    fn version(&self) -> u32 {
        match self {
            WatchedPayload::V0(_) => 0,
            WatchedPayload::V1(_) => 1,
            WatchedPayload::V2(_) => 2,
        }
    }

    fn decode(version: u32, body: Value) -> serde_json::Result<Self> {
        match version {
            0 => Ok(WatchedPayload::V0(body)),
            1 => decode_legacy(body).map(WatchedPayload::V1),
            2 => serde_json::from_value(body).map(WatchedPayload::V2),
            other => Err(serde_json::Error::custom(format!(
                "unknown watched schema version {other}"
            ))),
        }
    }

    fn encode(&self) -> serde_json::Result<Value> {
        match self {
            WatchedPayload::V0(body) => Ok(body.clone()),
            WatchedPayload::V1(data) => serde_json::to_value(data),
            WatchedPayload::V2(data) => serde_json::to_value(data),
        }
    }
}

#[derive(Deserialize)]
struct LegacyBody {
    #[serde(default)]
    items: Vec<Value>,
}

/// Read a flat history body entry by entry.
///
/// Entries that do not parse are logged and skipped; only a body whose
/// `items` is not a list fails as a whole.
pub fn decode_legacy(body: Value) -> serde_json::Result<LegacyData> {
    let LegacyBody { items } = serde_json::from_value(body)?;
    let items = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            serde_json::from_value::<LegacyItem>(raw)
                .inspect_err(|err| {
                    warn!(
                        target: "watchkeep::store",
                        index,
                        error = %err,
                        "skipping unreadable legacy entry"
                    );
                })
                .ok()
        })
        .collect();
    Ok(LegacyData { items })
}

fn unexpected(version: u32, payload: &WatchedPayload) -> MigrationError {
    MigrationError::UnexpectedPayload {
        version,
        expected: version - 1,
        found: payload.version(),
    }
}

/// Version 0 content is discarded; the flat history starts empty.
fn start_flat_history(
    payload: WatchedPayload,
    _context: &mut MigrationContext<WatchedPayload>,
) -> std::result::Result<WatchedPayload, MigrationError> {
    match payload {
        WatchedPayload::V0(_) => {
            Ok(WatchedPayload::V1(LegacyData::default()))
        }
        other => Err(unexpected(1, &other)),
    }
}

fn defer_reconciliation(
    reconciler: &Reconciler,
    payload: WatchedPayload,
    context: &mut MigrationContext<WatchedPayload>,
) -> std::result::Result<WatchedPayload, MigrationError> {
    let WatchedPayload::V1(legacy) = payload else {
        return Err(unexpected(2, &payload));
    };

    if !legacy.is_empty() {
        let reconciler = reconciler.clone();
        context.defer(move |store| reconciler.run(legacy, store));
    }
    Ok(WatchedPayload::V2(WatchedStoreData::default()))
}

/// Schema chain of the watch-progress store.
pub fn watched_chain(
    reconciler: Reconciler,
) -> std::result::Result<VersionChain<WatchedPayload>, ConfigurationError> {
    VersionChain::builder()
        .version(SchemaVersion::new(0))
        .version(SchemaVersion::new(1).with_migrate(start_flat_history))
        .version(
            SchemaVersion::new(2)
                .with_migrate(move |payload, context| {
                    defer_reconciliation(&reconciler, payload, context)
                })
                .with_create(|| {
                    WatchedPayload::V2(WatchedStoreData::default())
                }),
        )
        .build()
}

/// Typed facade over the versioned `video-progress` store.
#[derive(Debug, Clone)]
pub struct WatchedStore {
    inner: VersionedStore<WatchedPayload>,
}

impl WatchedStore {
    pub fn open(
        metadata: Arc<dyn MetadataService>,
        backend: Arc<dyn KeyValueBackend>,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> std::result::Result<Self, ConfigurationError> {
        Self::with_reconciler(
            WATCHED_STORE_KEY,
            Reconciler::new(metadata),
            backend,
            scheduler,
        )
    }

    pub fn with_reconciler(
        key: impl Into<String>,
        reconciler: Reconciler,
        backend: Arc<dyn KeyValueBackend>,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> std::result::Result<Self, ConfigurationError> {
        let chain = watched_chain(reconciler)?;
        Ok(Self {
            inner: VersionedStore::new(key, chain, backend, scheduler),
        })
    }

    pub fn load(&self) -> Result<WatchedStoreData> {
        self.inner
            .load()?
            .into_current(self.inner.latest_version())
    }

    pub fn save(&self, data: WatchedStoreData) -> Result<()> {
        self.inner.save(&WatchedPayload::V2(data))
    }

    pub fn versioned(&self) -> &VersionedStore<WatchedPayload> {
        &self.inner
    }
}

impl From<VersionedStore<WatchedPayload>> for WatchedStore {
    fn from(inner: VersionedStore<WatchedPayload>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::versioning::MigrationRunner;
    use serde_json::json;

    struct NoMetadata;

    #[async_trait::async_trait]
    impl watchkeep_contracts::metadata::MetadataSearch for NoMetadata {
        async fn search(
            &self,
            _query: &watchkeep_model::meta::SearchQuery,
        ) -> std::result::Result<
            Vec<watchkeep_model::meta::SearchHit>,
            watchkeep_contracts::metadata::LookupError,
        > {
            Ok(Vec::new())
        }
    }

    #[async_trait::async_trait]
    impl watchkeep_contracts::metadata::MetadataLookup for NoMetadata {
        async fn get_by_id(
            &self,
            _request: &watchkeep_model::meta::LookupRequest,
        ) -> std::result::Result<
            Option<watchkeep_model::meta::DetailedMeta>,
            watchkeep_contracts::metadata::LookupError,
        > {
            Ok(None)
        }
    }

    fn chain() -> VersionChain<WatchedPayload> {
        watched_chain(Reconciler::new(Arc::new(NoMetadata))).expect("chain")
    }

    #[test]
    fn chain_ends_at_structured_items() {
        let chain = chain();

        assert_eq!(chain.latest(), LATEST_WATCHED_VERSION);
        assert_eq!(
            chain.create(),
            WatchedPayload::V2(WatchedStoreData::default())
        );
    }

    #[test]
    fn unreadable_legacy_entries_are_skipped_individually() {
        let body = json!({
            "items": [
                {
                    "mediaId": 1,
                    "mediaType": "movie",
                    "percentage": 40,
                    "progress": 1200,
                    "providerId": "p",
                    "title": "Up",
                    "year": "2009"
                },
                { "mediaId": null, "title": 7 },
                "not an entry",
                {
                    "mediaId": "2",
                    "mediaType": "series",
                    "percentage": 10,
                    "progress": 5,
                    "title": "Show",
                    "year": "2010",
                    "seasonId": "1",
                    "episodeId": "3"
                }
            ]
        });

        let WatchedPayload::V1(legacy) =
            WatchedPayload::decode(1, body).expect("decode")
        else {
            panic!("expected a version 1 payload");
        };

        let ids: Vec<_> = legacy.items.iter().map(|i| i.media_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(legacy.items[1].episode_id, Some(3));
        assert!(WatchedPayload::decode(1, json!({ "items": 5 })).is_err());
    }

    #[test]
    fn untyped_history_is_discarded() {
        let chain = chain();
        let outcome = MigrationRunner::new(&chain)
            .run(0, WatchedPayload::V0(json!({ "whatever": [1, 2] })))
            .expect("walk");

        assert_eq!(outcome.applied, vec![1, 2]);
        assert_eq!(outcome.payload, WatchedPayload::V2(Default::default()));
        assert_eq!(outcome.deferred_len(), 0);
    }

    #[test]
    fn flat_history_defers_one_reconciliation() {
        let legacy: LegacyData = serde_json::from_value(json!({
            "items": [{
                "mediaId": 1,
                "mediaType": "movie",
                "percentage": 40,
                "progress": 1200,
                "providerId": "p",
                "title": "Up",
                "year": 2009
            }]
        }))
        .expect("legacy");
        let chain = chain();

        let outcome = MigrationRunner::new(&chain)
            .run(1, WatchedPayload::V1(legacy))
            .expect("walk");

        assert_eq!(outcome.applied, vec![2]);
        assert_eq!(outcome.payload, WatchedPayload::V2(Default::default()));
        assert_eq!(outcome.deferred_len(), 1);
    }

    #[test]
    fn decode_rejects_unknown_versions() {
        assert!(WatchedPayload::decode(3, json!({})).is_err());
        assert!(matches!(
            WatchedPayload::decode(0, json!({ "x": 1 })),
            Ok(WatchedPayload::V0(_))
        ));
    }
}
