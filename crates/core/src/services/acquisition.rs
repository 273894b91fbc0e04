//! The acquisition pipeline: turns a monitored content record
//! into one or more fire-and-forget search-then-grab tasks.
//!
//! Each task spawns detached via `tokio::spawn` and only logs failures
//! rather than surfacing them to the caller: the triggering HTTP response
//! has already gone out by the time a release is found.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{ContentKind, Search, SearchRequest};
use crate::events::{EventBus, SystemEvent};
use crate::models::DownloadClientKind;
use crate::services::manager::DownloadManager;

/// Counts spawned acquisition tasks, the WaitGroup-equivalent the facade
/// uses in tests to synchronize on fire-and-forget completion.
#[derive(Default)]
pub struct TaskTracker {
    spawned: AtomicU64,
    notify: tokio::sync::Notify,
}

impl TaskTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn mark_spawned(&self) {
        self.spawned.fetch_add(1, Ordering::SeqCst);
    }

    fn mark_done(&self) {
        self.notify.notify_waiters();
    }

    pub fn spawned_count(&self) -> u64 {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Waits until every task spawned so far has reported completion.
    /// Intended for tests; callers must know the expected count up front.
    pub async fn wait_for(&self, count: u64) {
        while self.spawned.load(Ordering::SeqCst) < count {
            self.notify.notified().await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct AcquisitionRequest {
    pub content_id: Uuid,
    pub title: String,
    pub year: Option<i32>,
    pub quality_profile: String,
    pub kind: ContentKind,
    /// Seasons the series has monitored episodes for. Ignored for movies.
    /// Empty for a series means "default to a season 1 pack".
    pub monitored_seasons: Vec<i32>,
}

pub struct AcquisitionPipeline {
    search: Arc<dyn Search>,
    manager: Arc<DownloadManager>,
    event_bus: Arc<EventBus>,
}

impl AcquisitionPipeline {
    pub fn new(search: Arc<dyn Search>, manager: Arc<DownloadManager>, event_bus: Arc<EventBus>) -> Self {
        Self {
            search,
            manager,
            event_bus,
        }
    }

    /// Spawns one fire-and-forget task per search this content kicks off
    /// and returns immediately; callers that need completion for tests
    /// pass a `TaskTracker` and await `wait_for`.
    pub fn run(self: &Arc<Self>, request: AcquisitionRequest, tracker: Option<Arc<TaskTracker>>) {
        match request.kind {
            ContentKind::Movie => {
                let query = match request.year {
                    Some(year) => format!("{} {}", request.title, year),
                    None => request.title.clone(),
                };
                self.spawn_search(request.content_id, query, ContentKind::Movie, request.quality_profile, None, false, tracker);
            }
            ContentKind::Series => {
                let seasons = if request.monitored_seasons.is_empty() {
                    vec![1]
                } else {
                    request.monitored_seasons
                };
                for season in seasons {
                    let query = format!("{} S{season:02}", request.title);
                    self.spawn_search(
                        request.content_id,
                        query,
                        ContentKind::Series,
                        request.quality_profile.clone(),
                        Some(season),
                        true,
                        tracker.clone(),
                    );
                }
            }
        }
    }

    fn spawn_search(
        self: &Arc<Self>,
        content_id: Uuid,
        query: String,
        kind: ContentKind,
        quality_profile: String,
        season: Option<i32>,
        is_complete_season: bool,
        tracker: Option<Arc<TaskTracker>>,
    ) {
        if let Some(tracker) = &tracker {
            tracker.mark_spawned();
        }
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            pipeline
                .search_and_grab(content_id, &query, kind, &quality_profile, season, is_complete_season)
                .await;
            if let Some(tracker) = tracker {
                tracker.mark_done();
            }
        });
    }

    async fn search_and_grab(
        &self,
        content_id: Uuid,
        query: &str,
        kind: ContentKind,
        quality_profile: &str,
        season: Option<i32>,
        is_complete_season: bool,
    ) {
        let cancel = CancellationToken::new();
        let request = SearchRequest {
            text: query.to_string(),
            kind: Some(kind),
            season,
            episode: None,
        };

        let outcome = match self.search.search(&cancel, &request, quality_profile).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(content_id = %content_id, query, "acquisition search failed: {err}");
                return;
            }
        };

        let Some(release) = outcome.releases.first() else {
            info!(content_id = %content_id, query, "acquisition search returned no releases");
            return;
        };

        self.event_bus.publish(SystemEvent::GrabRequested {
            content_id,
            release_name: release.title.clone(),
            indexer: release.indexer.clone(),
            season,
            is_complete_season,
            download_url: release.download_url.clone(),
        });

        if let Err(err) = self
            .manager
            .grab(
                &cancel,
                content_id,
                None,
                DownloadClientKind::Qbittorrent,
                &release.download_url,
                &release.title,
                &release.indexer,
            )
            .await
        {
            warn!(content_id = %content_id, "acquisition grab failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DownloadRepository, Downloader, ClientState, ClientStatus, DownloadFilter, Release};
    use crate::error::{CoreError, Result};
    use crate::models::{Download, DownloadStatus, StuckThresholds};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct FakeSearch {
        releases: Vec<Release>,
        calls: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl Search for FakeSearch {
        async fn search(
            &self,
            _cancel: &CancellationToken,
            request: &SearchRequest,
            _quality_profile: &str,
        ) -> Result<crate::domain::SearchOutcome> {
            self.calls.lock().unwrap().push(request.text.clone());
            Ok(crate::domain::SearchOutcome {
                releases: self.releases.clone(),
                errors: vec![],
            })
        }
    }

    struct FakeRepo {
        rows: StdMutex<HashMap<Uuid, Download>>,
    }

    #[async_trait]
    impl DownloadRepository for FakeRepo {
        async fn add(&self, download: &Download) -> Result<Download> {
            self.rows.lock().unwrap().insert(download.id, download.clone());
            Ok(download.clone())
        }
        async fn get(&self, id: Uuid) -> Result<Download> {
            self.rows.lock().unwrap().get(&id).cloned().ok_or_else(|| CoreError::NotFound { resource: "download".into() })
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
        async fn get_by_client_id(&self, _client: DownloadClientKind, _client_id: &str) -> Result<Option<Download>> {
            Ok(None)
        }
        async fn get_by_content_and_release(&self, content_id: Uuid, release_name: &str) -> Result<Option<Download>> {
            Ok(self.rows.lock().unwrap().values().find(|d| d.content_id == content_id && d.release_name == release_name).cloned())
        }
        async fn list_stuck(&self, _thresholds: &StuckThresholds) -> Result<Vec<Download>> {
            Ok(vec![])
        }
        async fn count_by_status(&self) -> Result<HashMap<DownloadStatus, i64>> {
            Ok(HashMap::new())
        }
    }

    struct FakeDownloader;

    #[async_trait]
    impl Downloader for FakeDownloader {
        async fn add(&self, _cancel: &CancellationToken, _url: &str, _category: &str) -> Result<String> {
            Ok("client-1".to_string())
        }
        async fn status(&self, _cancel: &CancellationToken, _client_id: &str) -> Result<ClientStatus> {
            Ok(ClientStatus { client_id: "client-1".into(), state: ClientState::Queued, progress: 0.0, path: None, size: 0, downloaded: 0 })
        }
        async fn list(&self, _cancel: &CancellationToken) -> Result<Vec<ClientStatus>> {
            Ok(vec![])
        }
        async fn remove(&self, _cancel: &CancellationToken, _client_id: &str, _delete_files: bool) -> Result<()> {
            Ok(())
        }
    }

    fn release(title: &str) -> Release {
        Release {
            title: title.to_string(),
            indexer: "prowlarr".to_string(),
            guid: "guid-1".to_string(),
            download_url: "magnet:?x".to_string(),
            size: 1024,
            publish_date: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn movie_path_searches_title_and_year_and_grabs_top_release() {
        let search = Arc::new(FakeSearch {
            releases: vec![release("Fight.Club.1999.1080p")],
            calls: StdMutex::new(vec![]),
        });
        let repo = Arc::new(FakeRepo { rows: StdMutex::new(HashMap::new()) });
        let downloader = Arc::new(FakeDownloader);
        let bus = Arc::new(EventBus::new());
        let manager = Arc::new(DownloadManager::new(repo.clone(), downloader, bus.clone()));
        let pipeline = Arc::new(AcquisitionPipeline::new(search.clone(), manager, bus));
        let tracker = TaskTracker::new();

        pipeline.run(
            AcquisitionRequest {
                content_id: Uuid::new_v4(),
                title: "Fight Club".to_string(),
                year: Some(1999),
                quality_profile: "HD-1080p".to_string(),
                kind: ContentKind::Movie,
                monitored_seasons: vec![],
            },
            Some(tracker.clone()),
        );
        tracker.wait_for(1).await;

        assert_eq!(search.calls.lock().unwrap().as_slice(), ["Fight Club 1999"]);
        let (downloads, total) = repo.list(&DownloadFilter::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(downloads[0].release_name, "Fight.Club.1999.1080p");
    }

    #[tokio::test]
    async fn series_path_issues_one_search_per_monitored_season() {
        let search = Arc::new(FakeSearch {
            releases: vec![release("Show.S01.1080p")],
            calls: StdMutex::new(vec![]),
        });
        let repo = Arc::new(FakeRepo { rows: StdMutex::new(HashMap::new()) });
        let downloader = Arc::new(FakeDownloader);
        let bus = Arc::new(EventBus::new());
        let manager = Arc::new(DownloadManager::new(repo.clone(), downloader, bus.clone()));
        let pipeline = Arc::new(AcquisitionPipeline::new(search.clone(), manager, bus));
        let tracker = TaskTracker::new();

        pipeline.run(
            AcquisitionRequest {
                content_id: Uuid::new_v4(),
                title: "Show".to_string(),
                year: None,
                quality_profile: "HD-1080p".to_string(),
                kind: ContentKind::Series,
                monitored_seasons: vec![1, 2],
            },
            Some(tracker.clone()),
        );
        tracker.wait_for(2).await;

        let mut calls = search.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, ["Show S01", "Show S02"]);
    }

    #[tokio::test]
    async fn series_path_defaults_to_season_one_when_no_seasons_monitored() {
        let search = Arc::new(FakeSearch {
            releases: vec![release("Show.S01.1080p")],
            calls: StdMutex::new(vec![]),
        });
        let repo = Arc::new(FakeRepo { rows: StdMutex::new(HashMap::new()) });
        let downloader = Arc::new(FakeDownloader);
        let bus = Arc::new(EventBus::new());
        let manager = Arc::new(DownloadManager::new(repo, downloader, bus.clone()));
        let pipeline = Arc::new(AcquisitionPipeline::new(search.clone(), manager, bus));
        let tracker = TaskTracker::new();

        pipeline.run(
            AcquisitionRequest {
                content_id: Uuid::new_v4(),
                title: "Show".to_string(),
                year: None,
                quality_profile: "HD-1080p".to_string(),
                kind: ContentKind::Series,
                monitored_seasons: vec![],
            },
            Some(tracker.clone()),
        );
        tracker.wait_for(1).await;

        assert_eq!(search.calls.lock().unwrap().as_slice(), ["Show S01"]);
    }

    #[tokio::test]
    async fn zero_releases_terminates_silently_without_grab() {
        let search = Arc::new(FakeSearch {
            releases: vec![],
            calls: StdMutex::new(vec![]),
        });
        let repo = Arc::new(FakeRepo { rows: StdMutex::new(HashMap::new()) });
        let downloader = Arc::new(FakeDownloader);
        let bus = Arc::new(EventBus::new());
        let manager = Arc::new(DownloadManager::new(repo.clone(), downloader, bus.clone()));
        let pipeline = Arc::new(AcquisitionPipeline::new(search, manager, bus));
        let tracker = TaskTracker::new();

        pipeline.run(
            AcquisitionRequest {
                content_id: Uuid::new_v4(),
                title: "Fight Club".to_string(),
                year: Some(1999),
                quality_profile: "HD-1080p".to_string(),
                kind: ContentKind::Movie,
                monitored_seasons: vec![],
            },
            Some(tracker.clone()),
        );
        tracker.wait_for(1).await;

        let (_downloads, total) = repo.list(&DownloadFilter::default()).await.unwrap();
        assert_eq!(total, 0);
    }
}
