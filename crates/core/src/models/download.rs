//! Download: an in-flight or recent acquisition attempt, and its state
//! machine.
//!
//! `DownloadStatus::can_transition_to` is the single source of truth for
//! the transition table; `Transition` (in
//! `crate::services::manager`) must consult it before mutating a row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "download_client_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DownloadClientKind {
    Sabnzbd,
    Qbittorrent,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "download_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Queued,
    Downloading,
    Completed,
    Imported,
    Failed,
    Cleaned,
}

impl DownloadStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Cleaned | DownloadStatus::Failed)
    }

    /// `active` filter excludes terminal states.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// The exact table. `Cleaned` is terminal and has no
    /// outbound edges; `Failed` permits a single retry edge back to
    /// `queued`.
    pub fn can_transition_to(&self, to: DownloadStatus) -> bool {
        use DownloadStatus::*;
        matches!(
            (self, to),
            (Queued, Downloading)
                | (Queued, Failed)
                | (Downloading, Completed)
                | (Downloading, Failed)
                | (Completed, Imported)
                | (Completed, Failed)
                | (Imported, Cleaned)
                | (Imported, Failed)
                | (Failed, Queued)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    pub id: Uuid,
    pub content_id: Uuid,
    pub episode_id: Option<Uuid>,
    pub client: DownloadClientKind,
    pub client_id: String,
    pub status: DownloadStatus,
    pub release_name: String,
    pub indexer: String,
    pub added_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_transition_at: DateTime<Utc>,
}

impl Download {
    pub fn new(
        content_id: Uuid,
        episode_id: Option<Uuid>,
        client: DownloadClientKind,
        client_id: impl Into<String>,
        release_name: impl Into<String>,
        indexer: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content_id,
            episode_id,
            client,
            client_id: client_id.into(),
            status: DownloadStatus::Queued,
            release_name: release_name.into(),
            indexer: indexer.into(),
            added_at: now,
            completed_at: None,
            last_transition_at: now,
        }
    }

    /// Applies a validated transition in place. Callers (the manager and
    /// reconciler) must check `can_transition_to` first; this only
    /// performs the mutation and the `completed_at` invariant. Emitting
    /// the `TransitionEvent` is the caller's responsibility, since only
    /// the caller holds the event bus handle.
    pub fn apply_transition(&mut self, to: DownloadStatus, at: DateTime<Utc>) {
        self.status = to;
        self.last_transition_at = at;
        if matches!(to, DownloadStatus::Completed | DownloadStatus::Failed) && self.completed_at.is_none() {
            self.completed_at = Some(at);
        }
    }
}

/// Filters accepted by `DownloadRepository::list`.
#[derive(Debug, Clone, Default)]
pub struct DownloadFilter {
    pub content_id: Option<Uuid>,
    pub episode_id: Option<Uuid>,
    pub status: Option<DownloadStatus>,
    pub client: Option<DownloadClientKind>,
    /// Excludes terminal states when true.
    pub active: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

/// Per-status staleness thresholds consumed by `ListStuck`.
#[derive(Debug, Clone)]
pub struct StuckThresholds {
    pub queued: chrono::Duration,
    pub downloading: chrono::Duration,
    pub completed: chrono::Duration,
}

impl Default for StuckThresholds {
    fn default() -> Self {
        Self {
            queued: chrono::Duration::hours(1),
            downloading: chrono::Duration::hours(12),
            completed: chrono::Duration::hours(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(DownloadStatus::Queued.can_transition_to(DownloadStatus::Downloading));
        assert!(DownloadStatus::Downloading.can_transition_to(DownloadStatus::Completed));
        assert!(DownloadStatus::Completed.can_transition_to(DownloadStatus::Imported));
        assert!(DownloadStatus::Imported.can_transition_to(DownloadStatus::Cleaned));
        assert!(DownloadStatus::Failed.can_transition_to(DownloadStatus::Queued));
    }

    #[test]
    fn any_non_terminal_can_fail() {
        assert!(DownloadStatus::Queued.can_transition_to(DownloadStatus::Failed));
        assert!(DownloadStatus::Downloading.can_transition_to(DownloadStatus::Failed));
        assert!(DownloadStatus::Completed.can_transition_to(DownloadStatus::Failed));
        assert!(DownloadStatus::Imported.can_transition_to(DownloadStatus::Failed));
    }

    #[test]
    fn cleaned_is_terminal_with_no_outbound_edges() {
        assert!(DownloadStatus::Cleaned.is_terminal());
        for to in [
            DownloadStatus::Queued,
            DownloadStatus::Downloading,
            DownloadStatus::Completed,
            DownloadStatus::Imported,
            DownloadStatus::Failed,
            DownloadStatus::Cleaned,
        ] {
            assert!(!DownloadStatus::Cleaned.can_transition_to(to));
        }
    }

    #[test]
    fn backwards_transitions_are_rejected() {
        assert!(!DownloadStatus::Completed.can_transition_to(DownloadStatus::Downloading));
        assert!(!DownloadStatus::Imported.can_transition_to(DownloadStatus::Downloading));
        assert!(!DownloadStatus::Imported.can_transition_to(DownloadStatus::Completed));
    }

    #[test]
    fn active_excludes_terminal_states() {
        assert!(DownloadStatus::Queued.is_active());
        assert!(DownloadStatus::Downloading.is_active());
        assert!(DownloadStatus::Completed.is_active());
        assert!(DownloadStatus::Imported.is_active());
        assert!(!DownloadStatus::Failed.is_active());
        assert!(!DownloadStatus::Cleaned.is_active());
    }

    #[test]
    fn completed_at_set_once_on_transition_to_completed() {
        let mut download = Download::new(
            Uuid::new_v4(),
            None,
            DownloadClientKind::Qbittorrent,
            "abc",
            "Fight.Club.1999.1080p",
            "prowlarr",
        );
        assert!(download.completed_at.is_none());
        let first = Utc::now();
        download.apply_transition(DownloadStatus::Downloading, first);
        assert!(download.completed_at.is_none());
        let completed_at = first + chrono::Duration::seconds(5);
        download.apply_transition(DownloadStatus::Completed, completed_at);
        assert_eq!(download.completed_at, Some(completed_at));

        // Re-entering a terminal-adjacent state later must not clear it.
        let imported_at = completed_at + chrono::Duration::seconds(5);
        download.apply_transition(DownloadStatus::Imported, imported_at);
        assert_eq!(download.completed_at, Some(completed_at));
    }
}
