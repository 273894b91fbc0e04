//! Capability contracts consumed by the core.
//!
//! These are the "external collaborators with pinned interfaces" this module
//! deliberately keeps out of scope: the concrete download-client protocol
//! and the release-indexer protocol. `gatherarr-downloaders` and
//! `gatherarr-indexers` each provide one implementation; the core only
//! ever depends on these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Movie,
    Series,
}

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub text: String,
    pub kind: Option<ContentKind>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub title: String,
    pub indexer: String,
    pub guid: String,
    pub download_url: String,
    pub size: i64,
    pub publish_date: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Already ranked by the search component; `releases[0]` is best.
    pub releases: Vec<Release>,
    pub errors: Vec<String>,
}

/// The release-indexer capability. Releases returned are pre-ranked; the
/// core never re-sorts them (ranking is an explicit non-goal).
#[async_trait]
pub trait Search: Send + Sync {
    async fn search(
        &self,
        cancel: &CancellationToken,
        request: &SearchRequest,
        quality_profile: &str,
    ) -> Result<SearchOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientState {
    Queued,
    Downloading,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientStatus {
    pub client_id: String,
    pub state: ClientState,
    pub progress: f32,
    /// Present once the backend reports the download finished.
    pub path: Option<String>,
    pub size: i64,
    pub downloaded: i64,
}

/// The download-client capability. `Status` returns `CoreError::DownloadNotFound`
/// when the backend no longer knows about `client_id` (orphan detection).
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn add(&self, cancel: &CancellationToken, url: &str, category: &str) -> Result<String>;
    async fn status(&self, cancel: &CancellationToken, client_id: &str) -> Result<ClientStatus>;
    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<ClientStatus>>;
    async fn remove(&self, cancel: &CancellationToken, client_id: &str, delete_files: bool)
        -> Result<()>;
}

/// Optional metadata-lookup enrichment for the facade's `lookup` responses.
/// Failure degrades gracefully to a stub; no implementation is
/// pinned beyond this trait.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn lookup_movie(&self, external_movie_id: i32) -> Result<Option<MetadataRecord>>;
    async fn lookup_series(&self, external_series_id: i32) -> Result<Option<MetadataRecord>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub title: String,
    pub year: Option<i32>,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
}

/// A no-op stub used when no metadata provider is configured.
pub struct NoopMetadataLookup;

#[async_trait]
impl MetadataLookup for NoopMetadataLookup {
    async fn lookup_movie(&self, _external_movie_id: i32) -> Result<Option<MetadataRecord>> {
        Ok(None)
    }

    async fn lookup_series(&self, _external_series_id: i32) -> Result<Option<MetadataRecord>> {
        Ok(None)
    }
}
