//! Structured watch-progress entries.

use chrono::{DateTime, Utc};

use crate::meta::CanonicalMeta;

/// Episode coordinates for a series entry.
///
/// `season`/`episode` are the 1-based numbers the user saw, while
/// `season_id`/`episode_id` are the canonical ids of the resolved metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct WatchedSeries {
    pub season: u32,
    pub episode: u32,
    pub season_id: String,
    pub episode_id: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WatchedMedia {
    pub meta: CanonicalMeta,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub series: Option<WatchedSeries>,
}

/// Uniqueness key of a [`WatchedItem`] inside [`WatchedStoreData`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchedKey {
    Movie { meta_id: String },
    Episode { meta_id: String, episode_id: String },
}

/// Progress for a single movie or episode.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct WatchedItem {
    pub item: WatchedMedia,
    /// Playback position in seconds.
    pub progress: f64,
    pub percentage: f64,
    #[cfg_attr(
        feature = "serde",
        serde(with = "chrono::serde::ts_milliseconds")
    )]
    pub watched_at: DateTime<Utc>,
}

impl WatchedItem {
    pub fn key(&self) -> WatchedKey {
        let meta_id = self.item.meta.id.clone();
        match &self.item.series {
            Some(series) => WatchedKey::Episode {
                meta_id,
                episode_id: series.episode_id.clone(),
            },
            None => WatchedKey::Movie { meta_id },
        }
    }
}

/// Payload body of the structured schema revision.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WatchedStoreData {
    #[cfg_attr(feature = "serde", serde(default))]
    pub items: Vec<WatchedItem>,
}

impl WatchedStoreData {
    pub fn new(items: Vec<WatchedItem>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, key: &WatchedKey) -> Option<&WatchedItem> {
        self.items.iter().find(|item| &item.key() == key)
    }

    /// Append `item` unless an entry with the same key exists.
    ///
    /// Returns `false` when the item was dropped as a duplicate.
    pub fn push_unique(&mut self, item: WatchedItem) -> bool {
        let key = item.key();
        if self.get(&key).is_some() {
            return false;
        }
        self.items.push(item);
        true
    }
}
