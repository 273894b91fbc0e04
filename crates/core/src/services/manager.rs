//! Download lifecycle operations: `Transition`, `Grab`, `Cancel`.
//!
//! `Grab` is fire-and-forget: it adds to the download client then persists,
//! best-effort removal on cancel, idempotent on (content, release), and
//! swallows downloader errors rather than failing the caller.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{DownloadRepository, Downloader};
use crate::error::{CoreError, Result};
use crate::events::{EventBus, SystemEvent};
use crate::models::{Download, DownloadClientKind, DownloadStatus};

pub struct DownloadManager {
    repository: Arc<dyn DownloadRepository>,
    downloader: Arc<dyn Downloader>,
    event_bus: Arc<EventBus>,
}

impl DownloadManager {
    pub fn new(
        repository: Arc<dyn DownloadRepository>,
        downloader: Arc<dyn Downloader>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            repository,
            downloader,
            event_bus,
        }
    }

    /// Validates `download.status.can_transition_to(to)`, applies the
    /// mutation, and emits exactly one `SystemEvent::Transition` on success.
    /// No mutation and no event on rejection.
    pub async fn transition(&self, download_id: Uuid, to: DownloadStatus) -> Result<Download> {
        let mut download = self.repository.get(download_id).await?;

        if !download.status.can_transition_to(to) {
            return Err(CoreError::InvalidTransition {
                from: format!("{:?}", download.status),
                to: format!("{to:?}"),
            });
        }

        let from = download.status;
        let at = chrono::Utc::now();
        download.apply_transition(to, at);
        let updated = self.repository.update(&download).await?;

        self.event_bus.publish(SystemEvent::Transition {
            download_id: updated.id,
            from,
            to,
            at,
        });

        Ok(updated)
    }

    /// Starts an acquisition: adds the release to the download client, then
    /// persists a `queued` row. Idempotent on `(content_id, release_name)` —
    /// a pre-existing row for that key is returned as-is, no second add.
    pub async fn grab(
        &self,
        cancel: &CancellationToken,
        content_id: Uuid,
        episode_id: Option<Uuid>,
        client: DownloadClientKind,
        download_url: &str,
        release_name: &str,
        indexer: &str,
    ) -> Result<Download> {
        if let Some(existing) = self
            .repository
            .get_by_content_and_release(content_id, release_name)
            .await?
        {
            return Ok(existing);
        }

        let client_id = self.downloader.add(cancel, download_url, "gatherarr").await?;

        let download = Download::new(content_id, episode_id, client, client_id, release_name, indexer);
        self.repository.add(&download).await
    }

    /// Removes a download: `notFound` bubbles, the downloader-side removal
    /// is best-effort (its error is swallowed — the client may have already
    /// dropped the task), and the store row is deleted unconditionally.
    pub async fn cancel(&self, cancel: &CancellationToken, download_id: Uuid, delete_files: bool) -> Result<()> {
        let download = self.repository.get(download_id).await?;

        if let Err(err) = self
            .downloader
            .remove(cancel, &download.client_id, delete_files)
            .await
        {
            warn!(download_id = %download_id, "ignoring downloader removal error: {err}");
        }

        self.repository.delete(download_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientState, ClientStatus, DownloadFilter};
    use crate::models::StuckThresholds;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct FakeRepo {
        rows: StdMutex<HashMap<Uuid, Download>>,
    }

    impl FakeRepo {
        fn new() -> Self {
            Self {
                rows: StdMutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl DownloadRepository for FakeRepo {
        async fn add(&self, download: &Download) -> Result<Download> {
            self.rows.lock().unwrap().insert(download.id, download.clone());
            Ok(download.clone())
        }
        async fn get(&self, id: Uuid) -> Result<Download> {
            self.rows
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| CoreError::NotFound { resource: "download".into() })
        }
        async fn list(&self, _filter: &DownloadFilter) -> Result<(Vec<Download>, i64)> {
            let rows: Vec<_> = self.rows.lock().unwrap().values().cloned().collect();
            let total = rows.len() as i64;
            Ok((rows, total))
        }
        async fn update(&self, download: &Download) -> Result<Download> {
            self.rows.lock().unwrap().insert(download.id, download.clone());
            Ok(download.clone())
        }
        async fn delete(&self, id: Uuid) -> Result<()> {
            self.rows.lock().unwrap().remove(&id);
            Ok(())
        }
        async fn get_by_client_id(
            &self,
            _client: DownloadClientKind,
            _client_id: &str,
        ) -> Result<Option<Download>> {
            Ok(None)
        }
        async fn get_by_content_and_release(
            &self,
            content_id: Uuid,
            release_name: &str,
        ) -> Result<Option<Download>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .find(|d| d.content_id == content_id && d.release_name == release_name)
                .cloned())
        }
        async fn list_stuck(&self, _thresholds: &StuckThresholds) -> Result<Vec<Download>> {
            Ok(vec![])
        }
        async fn count_by_status(&self) -> Result<HashMap<DownloadStatus, i64>> {
            Ok(HashMap::new())
        }
    }

    struct FakeDownloader {
        add_calls: StdMutex<u32>,
        fail_remove: bool,
    }

    #[async_trait]
    impl Downloader for FakeDownloader {
        async fn add(&self, _cancel: &CancellationToken, _url: &str, _category: &str) -> Result<String> {
            *self.add_calls.lock().unwrap() += 1;
            Ok("client-1".to_string())
        }
        async fn status(&self, _cancel: &CancellationToken, _client_id: &str) -> Result<ClientStatus> {
            Ok(ClientStatus {
                client_id: "client-1".into(),
                state: ClientState::Queued,
                progress: 0.0,
                path: None,
                size: 0,
                downloaded: 0,
            })
        }
        async fn list(&self, _cancel: &CancellationToken) -> Result<Vec<ClientStatus>> {
            Ok(vec![])
        }
        async fn remove(&self, _cancel: &CancellationToken, _client_id: &str, _delete_files: bool) -> Result<()> {
            if self.fail_remove {
                Err(CoreError::ClientUnavailable {
                    service: "qbittorrent".into(),
                    message: "already gone".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn grab_is_idempotent_on_content_and_release() {
        let repo = Arc::new(FakeRepo::new());
        let downloader = Arc::new(FakeDownloader {
            add_calls: StdMutex::new(0),
            fail_remove: false,
        });
        let bus = Arc::new(EventBus::new());
        let manager = DownloadManager::new(repo, downloader.clone(), bus);
        let content_id = Uuid::new_v4();
        let cancel = CancellationToken::new();

        let first = manager
            .grab(
                &cancel,
                content_id,
                None,
                DownloadClientKind::Qbittorrent,
                "magnet:?x",
                "Fight.Club.1999.1080p",
                "prowlarr",
            )
            .await
            .unwrap();
        let second = manager
            .grab(
                &cancel,
                content_id,
                None,
                DownloadClientKind::Qbittorrent,
                "magnet:?x",
                "Fight.Club.1999.1080p",
                "prowlarr",
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(*downloader.add_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn transition_rejects_invalid_without_mutation_or_event() {
        let repo = Arc::new(FakeRepo::new());
        let downloader = Arc::new(FakeDownloader {
            add_calls: StdMutex::new(0),
            fail_remove: false,
        });
        let bus = Arc::new(EventBus::new());
        let mut sub = bus.subscribe();
        let manager = DownloadManager::new(repo.clone(), downloader, bus);

        let mut download = Download::new(
            Uuid::new_v4(),
            None,
            DownloadClientKind::Qbittorrent,
            "client-1",
            "Fight.Club.1999.1080p",
            "prowlarr",
        );
        download.status = DownloadStatus::Completed;
        repo.add(&download).await.unwrap();

        let result = manager.transition(download.id, DownloadStatus::Downloading).await;
        assert!(result.is_err());

        let stored = repo.get(download.id).await.unwrap();
        assert_eq!(stored.status, DownloadStatus::Completed);

        let recv = tokio::time::timeout(std::time::Duration::from_millis(20), sub.recv()).await;
        assert!(recv.is_err(), "no event should have been published");
    }

    #[tokio::test]
    async fn cancel_swallows_downloader_error_and_deletes_unconditionally() {
        let repo = Arc::new(FakeRepo::new());
        let download = Download::new(
            Uuid::new_v4(),
            None,
            DownloadClientKind::Qbittorrent,
            "client-1",
            "Fight.Club.1999.1080p",
            "prowlarr",
        );
        repo.add(&download).await.unwrap();
        let downloader = Arc::new(FakeDownloader {
            add_calls: StdMutex::new(0),
            fail_remove: true,
        });
        let bus = Arc::new(EventBus::new());
        let manager = DownloadManager::new(repo.clone(), downloader, bus);

        manager
            .cancel(&CancellationToken::new(), download.id, true)
            .await
            .unwrap();

        assert!(repo.get(download.id).await.is_err());
    }

    #[tokio::test]
    async fn cancel_bubbles_not_found() {
        let repo = Arc::new(FakeRepo::new());
        let downloader = Arc::new(FakeDownloader {
            add_calls: StdMutex::new(0),
            fail_remove: false,
        });
        let bus = Arc::new(EventBus::new());
        let manager = DownloadManager::new(repo, downloader, bus);

        let result = manager.cancel(&CancellationToken::new(), Uuid::new_v4(), false).await;
        assert!(result.is_err());
    }
}
