//! A no-op `Downloader` for `client = manual`.
//!
//! Some content is acquired outside any automated backend (hand-placed
//! files, a manual download). This client lets that content flow through
//! the same grab/reconcile lifecycle as an automated one: `add` mints an
//! opaque id and immediately reports it complete, so the reconciler moves
//! the download straight to `completed` on the next pass.

use async_trait::async_trait;
use gatherarr_core::domain::capabilities::{ClientState, ClientStatus, Downloader};
use gatherarr_core::error::{CoreError, Result};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct ManualDownloader {
    entries: RwLock<Vec<ClientStatus>>,
}

impl ManualDownloader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Downloader for ManualDownloader {
    async fn add(&self, _cancel: &CancellationToken, url: &str, _category: &str) -> Result<String> {
        let client_id = Uuid::new_v4().to_string();
        let mut entries = self.entries.write().await;
        entries.push(ClientStatus {
            client_id: client_id.clone(),
            state: ClientState::Completed,
            progress: 1.0,
            path: Some(url.to_string()),
            size: 0,
            downloaded: 0,
        });
        Ok(client_id)
    }

    async fn status(&self, _cancel: &CancellationToken, client_id: &str) -> Result<ClientStatus> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .find(|e| e.client_id == client_id)
            .cloned()
            .ok_or_else(|| CoreError::DownloadNotFound {
                client_id: client_id.to_string(),
            })
    }

    async fn list(&self, _cancel: &CancellationToken) -> Result<Vec<ClientStatus>> {
        Ok(self.entries.read().await.clone())
    }

    async fn remove(&self, _cancel: &CancellationToken, client_id: &str, _delete_files: bool) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.retain(|e| e.client_id != client_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_reports_completed_immediately() {
        let downloader = ManualDownloader::new();
        let cancel = CancellationToken::new();
        let id = downloader.add(&cancel, "/mnt/media/movie.mkv", "movies").await.unwrap();
        let status = downloader.status(&cancel, &id).await.unwrap();
        assert_eq!(status.state, ClientState::Completed);
        assert_eq!(status.progress, 1.0);
    }

    #[tokio::test]
    async fn status_on_unknown_id_is_download_not_found() {
        let downloader = ManualDownloader::new();
        let cancel = CancellationToken::new();
        let err = downloader.status(&cancel, "missing").await.unwrap_err();
        assert!(err.is_download_not_found());
    }

    #[tokio::test]
    async fn remove_drops_the_entry() {
        let downloader = ManualDownloader::new();
        let cancel = CancellationToken::new();
        let id = downloader.add(&cancel, "/mnt/media/movie.mkv", "movies").await.unwrap();
        downloader.remove(&cancel, &id, false).await.unwrap();
        assert!(downloader.status(&cancel, &id).await.is_err());
    }
}
