use async_trait::async_trait;
use thiserror::Error;
use watchkeep_model::meta::{
    DetailedMeta, LookupRequest, SearchHit, SearchQuery,
};

/// Failure reported by a metadata collaborator.
///
/// Callers treat every variant as a soft miss; the distinction only matters
/// for logging.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Transport failure.
    #[error("metadata request failed: {0}")]
    Request(String),

    /// The service answered with something unreadable.
    #[error("metadata response could not be read: {0}")]
    Malformed(String),

    /// Credentials, quota or request refused by the service.
    #[error("metadata service rejected the request: {0}")]
    Rejected(String),
}

/// Free-text title search.
#[async_trait]
pub trait MetadataSearch: Send + Sync {
    /// Candidate titles for `query`, best match first.
    async fn search(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<SearchHit>, LookupError>;
}

/// Metadata for a known id.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Full metadata for a title, `Ok(None)` when the id is unknown.
    async fn get_by_id(
        &self,
        request: &LookupRequest,
    ) -> Result<Option<DetailedMeta>, LookupError>;
}

/// Convenience bound for services implementing both lookups.
pub trait MetadataService: MetadataSearch + MetadataLookup {}

impl<T: MetadataSearch + MetadataLookup + ?Sized> MetadataService for T {}
