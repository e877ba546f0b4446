//! Canonical metadata returned by the external metadata service.

use crate::media_type::MediaType;

/// Episode entry inside a season listing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpisodeSummary {
    pub id: String,
    pub number: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub title: String,
}

/// Season entry in a show's season listing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeasonSummary {
    pub id: String,
    pub number: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub title: String,
}

/// Full listing for a single season.
///
/// `episodes` is positionally indexed: episode `n` lives at `n - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeasonData {
    pub id: String,
    pub number: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub title: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub episodes: Vec<EpisodeSummary>,
}

impl SeasonData {
    /// Episode at 1-based position `number`.
    pub fn episode(&self, number: u32) -> Option<&EpisodeSummary> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.episodes.get(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SeriesDetail {
    /// Seasons in canonical order; legacy season `n` maps to index `n - 1`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub seasons: Vec<SeasonSummary>,
    pub season_data: SeasonData,
}

impl SeriesDetail {
    /// Season descriptor at 1-based position `number`.
    pub fn season(&self, number: u32) -> Option<&SeasonSummary> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.seasons.get(index)
    }
}

/// Type-specific part of [`CanonicalMeta`], discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "type", rename_all = "lowercase")
)]
pub enum MetaDetail {
    Movie,
    Series(SeriesDetail),
}

/// Authoritative descriptor for a title, keyed by a stable `id`.
///
/// For series the descriptor is season-scoped: every season resolves to its
/// own `CanonicalMeta` whose `season_data` describes that season.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanonicalMeta {
    pub id: String,
    pub title: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub year: Option<String>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub detail: MetaDetail,
}

impl CanonicalMeta {
    pub fn media_type(&self) -> MediaType {
        match self.detail {
            MetaDetail::Movie => MediaType::Movie,
            MetaDetail::Series(_) => MediaType::Series,
        }
    }

    pub fn series(&self) -> Option<&SeriesDetail> {
        match &self.detail {
            MetaDetail::Series(series) => Some(series),
            MetaDetail::Movie => None,
        }
    }

    pub fn season_data(&self) -> Option<&SeasonData> {
        self.series().map(|series| &series.season_data)
    }
}

/// Result of a by-id lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DetailedMeta {
    pub meta: CanonicalMeta,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub tmdb_id: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub imdb_id: Option<String>,
}

impl From<CanonicalMeta> for DetailedMeta {
    fn from(meta: CanonicalMeta) -> Self {
        Self {
            meta,
            tmdb_id: None,
            imdb_id: None,
        }
    }
}

/// Search request issued for one legacy title.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    pub title: String,
    pub year: i32,
    pub media_type: MediaType,
}

/// Search result, best match first.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    /// Release year as reported by the service; may carry a date suffix.
    pub year: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub media_type: MediaType,
}

/// By-id lookup request. `season_id` selects the season whose data the
/// returned series meta should carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupRequest {
    pub media_type: MediaType,
    pub id: String,
    pub season_id: Option<String>,
}

impl LookupRequest {
    pub fn title(media_type: MediaType, id: impl Into<String>) -> Self {
        Self {
            media_type,
            id: id.into(),
            season_id: None,
        }
    }

    pub fn season(id: impl Into<String>, season_id: impl Into<String>) -> Self {
        Self {
            media_type: MediaType::Series,
            id: id.into(),
            season_id: Some(season_id.into()),
        }
    }
}
