//! Shared facade state: every handler's `State<AppState>` extractor.
//!
//! Carries the database-backed repository handles plus every service
//! the two-surface facade needs: the download manager, the acquisition
//! pipeline, the event bus, and the downloader/metadata clients.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use gatherarr_core::config::Config;
use gatherarr_core::domain::repositories::{
    AuditRepository, ContentRepository, DownloadRepository, EpisodeRepository, FileRepository,
};
use gatherarr_core::domain::{Downloader, MetadataLookup};
use gatherarr_core::events::EventBus;
use gatherarr_core::services::acquisition::{AcquisitionPipeline, TaskTracker};
use gatherarr_core::services::manager::DownloadManager;

use crate::models::TagResource;

/// Tags have no catalog table; the facade keeps them in memory for the
/// lifetime of the process.
#[derive(Default)]
pub struct TagStore {
    next_id: Mutex<i32>,
    tags: Mutex<Vec<TagResource>>,
}

impl TagStore {
    pub fn list(&self) -> Vec<TagResource> {
        self.tags.lock().expect("tag store poisoned").clone()
    }

    pub fn create(&self, label: String) -> TagResource {
        let mut next_id = self.next_id.lock().expect("tag store poisoned");
        *next_id += 1;
        let tag = TagResource { id: *next_id, label };
        self.tags.lock().expect("tag store poisoned").push(tag.clone());
        tag
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub content_repo: Arc<dyn ContentRepository>,
    pub episode_repo: Arc<dyn EpisodeRepository>,
    pub file_repo: Arc<dyn FileRepository>,
    pub download_repo: Arc<dyn DownloadRepository>,
    pub audit_repo: Arc<dyn AuditRepository>,
    pub downloader: Arc<dyn Downloader>,
    pub metadata: Arc<dyn MetadataLookup>,
    pub manager: Arc<DownloadManager>,
    pub acquisition: Arc<AcquisitionPipeline>,
    pub event_bus: Arc<EventBus>,
    /// Set only in tests, so handlers can synchronize on the fire-and-forget
    /// acquisition tasks an add/update spawns.
    pub task_tracker: Option<Arc<TaskTracker>>,
    pub tags: Arc<TagStore>,
    pub started_at: DateTime<Utc>,
}
