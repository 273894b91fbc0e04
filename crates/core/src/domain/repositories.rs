//! Catalog store repository traits.
//!
//! Uniform shape per entity: `add`/`get`/`list`/`update`/
//! `delete`, plus the derived operations each entity's lifecycle needs.
//! `CatalogTransaction` exposes the same mutating surface scoped to a
//! single connection.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Content, ContentFilter, Download, DownloadFilter, Episode, EpisodeFilter, MediaFile,
    FileFilter, SeriesStats, StuckThresholds,
};

#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn add(&self, content: &Content) -> Result<Content>;
    async fn get(&self, id: Uuid) -> Result<Content>;
    async fn list(&self, filter: &ContentFilter) -> Result<(Vec<Content>, i64)>;
    async fn update(&self, content: &Content) -> Result<Content>;
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Idempotency lookup used by the facade's add path, keyed by external id.
    async fn find_by_external_movie_id(&self, external_movie_id: i32) -> Result<Option<Content>>;
    async fn find_by_external_series_id(&self, external_series_id: i32) -> Result<Option<Content>>;
}

#[async_trait]
pub trait EpisodeRepository: Send + Sync {
    async fn add(&self, episode: &Episode) -> Result<Episode>;
    async fn get(&self, id: Uuid) -> Result<Episode>;
    async fn list(&self, filter: &EpisodeFilter) -> Result<(Vec<Episode>, i64)>;
    async fn update(&self, episode: &Episode) -> Result<Episode>;
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Returns `(episode, created)`; `created = false` when a row for
    /// `(content_id, season, episode)` already existed.
    async fn find_or_create(
        &self,
        content_id: Uuid,
        season: i32,
        episode: i32,
        title: &str,
    ) -> Result<(Episode, bool)>;

    /// Insert-or-ignore in bulk; returns the number of rows actually inserted.
    async fn bulk_add(&self, episodes: &[Episode]) -> Result<i64>;

    async fn get_series_stats(&self, content_id: Uuid) -> Result<SeriesStats>;
    /// Only series with at least one episode are returned.
    async fn get_series_stats_batch(&self, content_ids: &[Uuid]) -> Result<Vec<SeriesStats>>;
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn add(&self, file: &MediaFile) -> Result<MediaFile>;
    async fn get(&self, id: Uuid) -> Result<MediaFile>;
    async fn list(&self, filter: &FileFilter) -> Result<(Vec<MediaFile>, i64)>;
    async fn update(&self, file: &MediaFile) -> Result<MediaFile>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait DownloadRepository: Send + Sync {
    /// Idempotent on `(content_id, release_name)`: if a row already exists
    /// for that key, returns the existing row rather than inserting.
    async fn add(&self, download: &Download) -> Result<Download>;
    async fn get(&self, id: Uuid) -> Result<Download>;
    async fn list(&self, filter: &DownloadFilter) -> Result<(Vec<Download>, i64)>;
    async fn update(&self, download: &Download) -> Result<Download>;
    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn get_by_client_id(
        &self,
        client: crate::models::DownloadClientKind,
        client_id: &str,
    ) -> Result<Option<Download>>;

    async fn get_by_content_and_release(
        &self,
        content_id: Uuid,
        release_name: &str,
    ) -> Result<Option<Download>>;

    async fn list_stuck(&self, thresholds: &StuckThresholds) -> Result<Vec<Download>>;

    async fn count_by_status(
        &self,
    ) -> Result<std::collections::HashMap<crate::models::DownloadStatus, i64>>;
}

/// Append-only audit trail over every event the bus observes.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn record(&self, entry: &crate::events::AuditEntry) -> Result<crate::events::AuditEntry>;
    async fn recent(&self, limit: i64, offset: i64) -> Result<(Vec<crate::events::AuditEntry>, i64)>;
    async fn for_entity(
        &self,
        entity_type: &str,
        entity_id: Uuid,
    ) -> Result<Vec<crate::events::AuditEntry>>;
}

/// A transactional handle exposing the same mutating operations as the
/// store, scoped to one connection. Reads inside the transaction observe
/// its own uncommitted writes; nothing is visible outside until `commit`.
#[async_trait]
pub trait CatalogTransaction: Send {
    async fn add_content(&mut self, content: &Content) -> Result<Content>;
    async fn update_content(&mut self, content: &Content) -> Result<Content>;
    async fn delete_content(&mut self, id: Uuid) -> Result<()>;

    async fn add_episode(&mut self, episode: &Episode) -> Result<Episode>;
    async fn add_download(&mut self, download: &Download) -> Result<Download>;

    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}
