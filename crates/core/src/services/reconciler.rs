//! The download lifecycle reconciler.
//!
//! Polls every active download against the injected `Downloader`, applying
//! forward transitions, detecting orphans, and refusing to let a stale
//! backwards report resurrect a terminated or progressed row. Runs on a
//! periodic `tokio::time::interval`, per-record try/log/continue, enforcing
//! the transition table rather than overwriting status unconditionally.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::domain::{ClientState, DownloadRepository, Downloader};
use crate::error::{CoreError, Result};
use crate::events::{EventBus, SystemEvent};
use crate::models::{Download, DownloadFilter, DownloadStatus};

pub struct Reconciler {
    repository: Arc<dyn DownloadRepository>,
    downloader: Arc<dyn Downloader>,
    event_bus: Arc<EventBus>,
}

impl Reconciler {
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

    /// Runs one reconciliation pass. Per-record errors are logged and the
    /// loop continues; the returned error, if any, is the last one
    /// observed (callers treat `Err` as "at least one record failed").
    pub async fn reconcile_once(&self, cancel: &CancellationToken) -> Result<()> {
        let filter = DownloadFilter {
            active: Some(true),
            limit: i64::MAX,
            ..Default::default()
        };
        let (downloads, _total) = self.repository.list(&filter).await?;

        let mut last_error: Option<CoreError> = None;
        for download in downloads {
            if cancel.is_cancelled() {
                break;
            }
            if let Err(err) = self.reconcile_one(&download, cancel).await {
                error!(download_id = %download.id, "reconciliation failed: {err}");
                last_error = Some(err);
            }
        }

        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Runs `reconcile_once` on an interval until `cancel` fires.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("reconciler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.reconcile_once(&cancel).await {
                        warn!("reconciliation pass completed with errors: {err}");
                    }
                }
            }
        }
    }

    async fn reconcile_one(&self, download: &Download, cancel: &CancellationToken) -> Result<()> {
        let reported = match self.downloader.status(cancel, &download.client_id).await {
            Ok(status) => status,
            Err(err) if err.is_download_not_found() => {
                self.transition(download, DownloadStatus::Failed).await?;
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let reported_status = map_client_state(reported.state);

        if reported_status == download.status {
            return Ok(());
        }

        if download.status.can_transition_to(reported_status) {
            self.transition(download, reported_status).await?;
        } else {
            // A backwards (or otherwise invalid) report from a disagreeing
            // downloader must never resurrect terminated or progressed work.
            debug!(
                download_id = %download.id,
                current = ?download.status,
                reported = ?reported_status,
                "ignoring stale/backwards downloader report"
            );
        }

        Ok(())
    }

    async fn transition(&self, download: &Download, to: DownloadStatus) -> Result<()> {
        if !download.status.can_transition_to(to) {
            return Err(CoreError::InvalidTransition {
                from: format!("{:?}", download.status),
                to: format!("{to:?}"),
            });
        }

        let mut updated = download.clone();
        let at = chrono::Utc::now();
        let from = updated.status;
        updated.apply_transition(to, at);
        self.repository.update(&updated).await?;

        self.event_bus.publish(SystemEvent::Transition {
            download_id: updated.id,
            from,
            to,
            at,
        });

        Ok(())
    }
}

fn map_client_state(state: ClientState) -> DownloadStatus {
    match state {
        ClientState::Queued => DownloadStatus::Queued,
        ClientState::Downloading => DownloadStatus::Downloading,
        ClientState::Completed => DownloadStatus::Completed,
        ClientState::Failed => DownloadStatus::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientStatus, DownloadRepository, Downloader};
    use crate::models::{DownloadClientKind, StuckThresholds};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use uuid::Uuid;

    struct FakeRepo {
        rows: StdMutex<HashMap<Uuid, Download>>,
    }

    impl FakeRepo {
        fn new(rows: Vec<Download>) -> Self {
            Self {
                rows: StdMutex::new(rows.into_iter().map(|d| (d.id, d)).collect()),
            }
        }

        fn get_status(&self, id: Uuid) -> DownloadStatus {
            self.rows.lock().unwrap().get(&id).unwrap().status
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
        async fn list(&self, filter: &DownloadFilter) -> Result<(Vec<Download>, i64)> {
            let rows: Vec<Download> = self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|d| filter.active != Some(true) || d.status.is_active())
                .cloned()
                .collect();
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
            _content_id: Uuid,
            _release_name: &str,
        ) -> Result<Option<Download>> {
            Ok(None)
        }
        async fn list_stuck(&self, _thresholds: &StuckThresholds) -> Result<Vec<Download>> {
            Ok(vec![])
        }
        async fn count_by_status(&self) -> Result<HashMap<DownloadStatus, i64>> {
            Ok(HashMap::new())
        }
    }

    struct ScriptedDownloader {
        responses: StdMutex<HashMap<String, Result<ClientStatus>>>,
    }

    fn status(state: ClientState) -> ClientStatus {
        ClientStatus {
            client_id: "x".into(),
            state,
            progress: 0.0,
            path: None,
            size: 0,
            downloaded: 0,
        }
    }

    #[async_trait]
    impl Downloader for ScriptedDownloader {
        async fn add(&self, _cancel: &CancellationToken, _url: &str, _category: &str) -> Result<String> {
            unimplemented!()
        }
        async fn status(&self, _cancel: &CancellationToken, client_id: &str) -> Result<ClientStatus> {
            match self.responses.lock().unwrap().remove(client_id) {
                Some(result) => result,
                None => Err(CoreError::DownloadNotFound {
                    client_id: client_id.to_string(),
                }),
            }
        }
        async fn list(&self, _cancel: &CancellationToken) -> Result<Vec<ClientStatus>> {
            Ok(vec![])
        }
        async fn remove(&self, _cancel: &CancellationToken, _client_id: &str, _delete_files: bool) -> Result<()> {
            Ok(())
        }
    }

    fn make_download(client_id: &str, status: DownloadStatus) -> Download {
        let mut d = Download::new(
            Uuid::new_v4(),
            None,
            DownloadClientKind::Qbittorrent,
            client_id,
            "Some.Release.1080p",
            "prowlarr",
        );
        d.status = status;
        d
    }

    #[tokio::test]
    async fn stale_backwards_report_does_not_overwrite_completed() {
        let download = make_download("c1", DownloadStatus::Completed);
        let repo = Arc::new(FakeRepo::new(vec![download.clone()]));
        let mut responses = HashMap::new();
        responses.insert("c1".to_string(), Ok(status(ClientState::Downloading)));
        let downloader = Arc::new(ScriptedDownloader {
            responses: StdMutex::new(responses),
        });
        let bus = Arc::new(EventBus::new());
        let reconciler = Reconciler::new(repo.clone(), downloader, bus);

        reconciler.reconcile_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(repo.get_status(download.id), DownloadStatus::Completed);
    }

    #[tokio::test]
    async fn orphan_detection_marks_failed() {
        let download = make_download("gone", DownloadStatus::Downloading);
        let repo = Arc::new(FakeRepo::new(vec![download.clone()]));
        let downloader = Arc::new(ScriptedDownloader {
            responses: StdMutex::new(HashMap::new()),
        });
        let bus = Arc::new(EventBus::new());
        let reconciler = Reconciler::new(repo.clone(), downloader, bus);

        reconciler.reconcile_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(repo.get_status(download.id), DownloadStatus::Failed);
    }

    #[tokio::test]
    async fn partial_failure_advances_the_others() {
        let good1 = make_download("g1", DownloadStatus::Downloading);
        let bad = make_download("bad", DownloadStatus::Downloading);
        let good2 = make_download("g2", DownloadStatus::Downloading);
        let repo = Arc::new(FakeRepo::new(vec![good1.clone(), bad.clone(), good2.clone()]));

        let mut responses = HashMap::new();
        responses.insert("g1".to_string(), Ok(status(ClientState::Completed)));
        responses.insert(
            "bad".to_string(),
            Err(CoreError::ClientUnavailable {
                service: "qbittorrent".into(),
                message: "timeout".into(),
            }),
        );
        responses.insert("g2".to_string(), Ok(status(ClientState::Completed)));
        let downloader = Arc::new(ScriptedDownloader {
            responses: StdMutex::new(responses),
        });
        let bus = Arc::new(EventBus::new());
        let reconciler = Reconciler::new(repo.clone(), downloader, bus);

        let result = reconciler.reconcile_once(&CancellationToken::new()).await;
        assert!(result.is_err());

        assert_eq!(repo.get_status(good1.id), DownloadStatus::Completed);
        assert_eq!(repo.get_status(good2.id), DownloadStatus::Completed);
        assert_eq!(repo.get_status(bad.id), DownloadStatus::Downloading);
    }

    #[tokio::test]
    async fn matching_reported_status_is_a_no_op() {
        let download = make_download("c1", DownloadStatus::Downloading);
        let repo = Arc::new(FakeRepo::new(vec![download.clone()]));
        let mut responses = HashMap::new();
        responses.insert("c1".to_string(), Ok(status(ClientState::Downloading)));
        let downloader = Arc::new(ScriptedDownloader {
            responses: StdMutex::new(responses),
        });
        let bus = Arc::new(EventBus::new());
        let reconciler = Reconciler::new(repo.clone(), downloader, bus);

        reconciler.reconcile_once(&CancellationToken::new()).await.unwrap();

        assert_eq!(repo.get_status(download.id), DownloadStatus::Downloading);
    }

    #[tokio::test]
    async fn forward_report_sets_completed_at() {
        let download = make_download("c1", DownloadStatus::Downloading);
        let repo = Arc::new(FakeRepo::new(vec![download.clone()]));
        let mut responses = HashMap::new();
        responses.insert("c1".to_string(), Ok(status(ClientState::Completed)));
        let downloader = Arc::new(ScriptedDownloader {
            responses: StdMutex::new(responses),
        });
        let bus = Arc::new(EventBus::new());
        let reconciler = Reconciler::new(repo.clone(), downloader, bus);

        reconciler.reconcile_once(&CancellationToken::new()).await.unwrap();

        let stored = repo.get(download.id).await.unwrap();
        assert_eq!(stored.status, DownloadStatus::Completed);
        assert!(stored.completed_at.is_some());
    }
}
