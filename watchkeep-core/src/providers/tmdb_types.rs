use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use watchkeep_model::media_type::MediaType;
use watchkeep_model::meta::{
    CanonicalMeta, DetailedMeta, EpisodeSummary, MetaDetail, SearchHit,
    SeasonData, SeasonSummary, SeriesDetail,
};

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_date))
}

fn year_of(date: Option<NaiveDate>) -> Option<String> {
    date.map(|date| date.year().to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchParams<'a> {
    pub api_key: &'a str,
    pub query: &'a str,
    pub include_adult: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailParams<'a> {
    pub api_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append_to_response: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieResult {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub release_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvResult {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub first_air_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieDetails {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalIds {
    #[serde(default)]
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvDetails {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub first_air_date: Option<NaiveDate>,
    #[serde(default)]
    pub seasons: Vec<TvSeasonRef>,
    #[serde(default)]
    pub external_ids: ExternalIds,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvSeasonRef {
    pub id: u64,
    pub season_number: u32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonDetails {
    pub id: u64,
    pub season_number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub episodes: Vec<EpisodeRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeRef {
    pub id: u64,
    pub episode_number: u32,
    #[serde(default)]
    pub name: String,
}

impl From<MovieResult> for SearchHit {
    fn from(result: MovieResult) -> Self {
        SearchHit {
            id: result.id.to_string(),
            title: result.title,
            year: year_of(result.release_date).unwrap_or_default(),
            media_type: MediaType::Movie,
        }
    }
}

impl From<TvResult> for SearchHit {
    fn from(result: TvResult) -> Self {
        SearchHit {
            id: result.id.to_string(),
            title: result.name,
            year: year_of(result.first_air_date).unwrap_or_default(),
            media_type: MediaType::Series,
        }
    }
}

impl From<MovieDetails> for DetailedMeta {
    fn from(details: MovieDetails) -> Self {
        let id = details.id.to_string();
        DetailedMeta {
            meta: CanonicalMeta {
                id: id.clone(),
                title: details.title,
                year: year_of(details.release_date),
                detail: MetaDetail::Movie,
            },
            tmdb_id: Some(id),
            imdb_id: details.imdb_id.filter(|imdb| !imdb.is_empty()),
        }
    }
}

impl TvDetails {
    /// Regular seasons ordered by number. Specials (season 0) are left out.
    pub fn regular_seasons(&self) -> Vec<&TvSeasonRef> {
        let mut seasons: Vec<&TvSeasonRef> = self
            .seasons
            .iter()
            .filter(|season| season.season_number > 0)
            .collect();
        seasons.sort_by_key(|season| season.season_number);
        seasons
    }

    /// Season number to fetch for `season_id`, or the first regular season
    /// when no id is given.
    pub fn season_number_for(&self, season_id: Option<&str>) -> Option<u32> {
        let seasons = self.regular_seasons();
        match season_id {
            Some(wanted) => seasons
                .into_iter()
                .find(|season| season.id.to_string() == wanted)
                .map(|season| season.season_number),
            None => seasons.first().map(|season| season.season_number),
        }
    }

    pub fn into_meta(self, season: SeasonDetails) -> DetailedMeta {
        let seasons = self
            .regular_seasons()
            .into_iter()
            .map(|season| SeasonSummary {
                id: season.id.to_string(),
                number: season.season_number,
                title: season.name.clone(),
            })
            .collect();
        let id = self.id.to_string();

        DetailedMeta {
            meta: CanonicalMeta {
                id: id.clone(),
                title: self.name,
                year: year_of(self.first_air_date),
                detail: MetaDetail::Series(SeriesDetail {
                    seasons,
                    season_data: season.into(),
                }),
            },
            tmdb_id: Some(id),
            imdb_id: self.external_ids.imdb_id.filter(|imdb| !imdb.is_empty()),
        }
    }
}

impl From<SeasonDetails> for SeasonData {
    fn from(season: SeasonDetails) -> Self {
        let mut episodes: Vec<EpisodeSummary> = season
            .episodes
            .into_iter()
            .map(|episode| EpisodeSummary {
                id: episode.id.to_string(),
                number: episode.episode_number,
                title: episode.name,
            })
            .collect();
        episodes.sort_by_key(|episode| episode.number);

        SeasonData {
            id: season.id.to_string(),
            number: season.season_number,
            title: season.name,
            episodes,
        }
    }
}
