use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;
use watchkeep_contracts::metadata::{
    LookupError, MetadataLookup, MetadataSearch,
};
use watchkeep_model::media_type::MediaType;
use watchkeep_model::meta::{
    DetailedMeta, LookupRequest, SearchHit, SearchQuery,
};

use super::tmdb_types::{
    DetailParams, MovieDetails, MovieResult, SearchPage, SearchParams,
    SeasonDetails, TvDetails, TvResult,
};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not found")]
    NotFound,

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<ProviderError> for LookupError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NetworkError(_) | ProviderError::InvalidUrl(_) => {
                LookupError::Request(err.to_string())
            }
            ProviderError::ParseError(_) => {
                LookupError::Malformed(err.to_string())
            }
            ProviderError::ApiError(_)
            | ProviderError::NotFound
            | ProviderError::RateLimited
            | ProviderError::InvalidApiKey => {
                LookupError::Rejected(err.to_string())
            }
        }
    }
}

pub const TMDB_V3_BASE: &str = "https://api.themoviedb.org/3";

#[derive(Clone)]
pub struct TmdbSettings {
    pub api_key: String,
    pub base_url: Url,
    pub language: Option<String>,
}

impl fmt::Debug for TmdbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("language", &self.language)
            .finish()
    }
}

impl TmdbSettings {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let base_url = Url::parse(TMDB_V3_BASE)
            .map_err(|err| ProviderError::InvalidUrl(err.to_string()))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url,
            language: None,
        })
    }
}

/// Metadata search and by-id lookups over the TMDB v3 JSON API.
///
/// Ids handed out in [`SearchHit`]s and [`DetailedMeta`] are TMDB numeric ids
/// rendered as strings; season ids are TMDB season ids.
pub struct TmdbMetadataService {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    language: Option<String>,
}

impl fmt::Debug for TmdbMetadataService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbMetadataService")
            .field("base_url", &self.base_url.as_str())
            .field("language", &self.language)
            .finish()
    }
}

impl TmdbMetadataService {
    pub fn new(settings: TmdbSettings) -> Self {
        Self::with_client(reqwest::Client::new(), settings)
    }

    pub fn with_client(http: reqwest::Client, settings: TmdbSettings) -> Self {
        Self {
            http,
            base_url: settings.base_url,
            api_key: settings.api_key,
            language: settings.language,
        }
    }

    /// Absolute URL for the path `segments` below the configured base.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ProviderError::InvalidUrl(self.base_url.to_string())
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_tmdb_json<Q, T>(
        &self,
        url: Url,
        query: &Q,
    ) -> Result<T, ProviderError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.http.get(url).query(query).send().await?;

        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await?;
            return serde_json::from_slice(&body)
                .map_err(|err| ProviderError::ParseError(err.to_string()));
        }

        #[derive(Debug, Deserialize)]
        struct TmdbErrorBody {
            #[serde(default)]
            status_message: Option<String>,
        }

        let message = response
            .json::<TmdbErrorBody>()
            .await
            .ok()
            .and_then(|body| body.status_message)
            .unwrap_or_else(|| {
                format!("TMDB request failed with status {}", status)
            });

        match status.as_u16() {
            401 => Err(ProviderError::InvalidApiKey),
            404 => Err(ProviderError::NotFound),
            429 => Err(ProviderError::RateLimited),
            _ => Err(ProviderError::ApiError(message)),
        }
    }

    fn detail_params(
        &self,
        append_to_response: Option<&'static str>,
    ) -> DetailParams<'_> {
        DetailParams {
            api_key: &self.api_key,
            language: self.language.as_deref(),
            append_to_response,
        }
    }

    /// Query parameters for a title search. The release year is left out:
    /// TMDB's year filters are exact, and callers accept neighbouring years.
    fn search_params<'a>(&'a self, title: &'a str) -> SearchParams<'a> {
        SearchParams {
            api_key: &self.api_key,
            query: title,
            include_adult: false,
            language: self.language.as_deref(),
        }
    }

    pub async fn search_movies(
        &self,
        title: &str,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        let page: SearchPage<MovieResult> = self
            .get_tmdb_json(
                self.endpoint(&["search", "movie"])?,
                &self.search_params(title),
            )
            .await?;
        Ok(page.results.into_iter().map(SearchHit::from).collect())
    }

    pub async fn search_series(
        &self,
        title: &str,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        let page: SearchPage<TvResult> = self
            .get_tmdb_json(
                self.endpoint(&["search", "tv"])?,
                &self.search_params(title),
            )
            .await?;
        Ok(page.results.into_iter().map(SearchHit::from).collect())
    }

    pub async fn movie(
        &self,
        id: &str,
    ) -> Result<DetailedMeta, ProviderError> {
        let details: MovieDetails = self
            .get_tmdb_json(
                self.endpoint(&["movie", id])?,
                &self.detail_params(None),
            )
            .await?;
        Ok(details.into())
    }

    /// Show metadata carrying the season `season_id`, or the first regular
    /// season when no id is given.
    pub async fn series(
        &self,
        id: &str,
        season_id: Option<&str>,
    ) -> Result<DetailedMeta, ProviderError> {
        let show: TvDetails = self
            .get_tmdb_json(
                self.endpoint(&["tv", id])?,
                &self.detail_params(Some("external_ids")),
            )
            .await?;

        let Some(number) = show.season_number_for(season_id) else {
            debug!(
                target: "watchkeep::tmdb",
                id,
                season_id,
                "show has no matching regular season"
            );
            return Err(ProviderError::NotFound);
        };

        let number = number.to_string();
        let season: SeasonDetails = self
            .get_tmdb_json(
                self.endpoint(&["tv", id, "season", &number])?,
                &self.detail_params(None),
            )
            .await?;
        Ok(show.into_meta(season))
    }
}

#[async_trait]
impl MetadataSearch for TmdbMetadataService {
    async fn search(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<SearchHit>, LookupError> {
        let hits = match query.media_type {
            MediaType::Movie => self.search_movies(&query.title).await,
            MediaType::Series => self.search_series(&query.title).await,
        };

        hits.map_err(|err| {
            error!(
                target: "watchkeep::tmdb",
                title = %query.title,
                year = query.year,
                error = %err,
                "TMDB search failed"
            );
            err.into()
        })
    }
}

#[async_trait]
impl MetadataLookup for TmdbMetadataService {
    async fn get_by_id(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<DetailedMeta>, LookupError> {
        let result = match request.media_type {
            MediaType::Movie => self.movie(&request.id).await,
            MediaType::Series => {
                self.series(&request.id, request.season_id.as_deref()).await
            }
        };

        match result {
            Ok(meta) => Ok(Some(meta)),
            Err(ProviderError::NotFound) => Ok(None),
            Err(err) => {
                error!(
                    target: "watchkeep::tmdb",
                    id = %request.id,
                    season_id = ?request.season_id,
                    error = %err,
                    "TMDB lookup failed"
                );
                Err(err.into())
            }
        }
    }
}
