//! The queue: active downloads enriched with live client status.
//!
//! Joins active downloads with a live `Downloader.status` call per row —
//! the catalog store stays the source of truth for which downloads
//! exist, the downloader is only consulted for
//! the transient fields (`timeleft`, `estimatedCompletionTime`) it alone
//! knows, and any downloader error degrades that one row rather than
//! failing the whole response.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use gatherarr_core::models::{ContentType, Download, DownloadFilter};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::error::ApiResult;
use crate::models::{PaginationQuery, QueueResource, QueueResponse};
use crate::state::AppState;

#[instrument(skip(state))]
pub async fn get_queue(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationQuery>,
) -> ApiResult<Json<QueueResponse>> {
    let (limit, offset) = pagination.limit_offset();
    let filter = DownloadFilter {
        active: Some(true),
        limit,
        offset,
        ..Default::default()
    };
    let (downloads, total) = state.download_repo.list(&filter).await?;

    let mut records = Vec::with_capacity(downloads.len());
    for download in &downloads {
        records.push(enrich(&state, download).await);
    }

    Ok(Json(QueueResponse {
        page: pagination.page(),
        page_size: pagination.page_size(),
        total_records: total,
        records,
    }))
}

async fn enrich(state: &AppState, download: &Download) -> QueueResource {
    let (mut movie_id, mut series_id) = (None, None);
    match state.content_repo.get(download.content_id).await {
        Ok(content) => match content.content_type {
            ContentType::Movie => movie_id = Some(content.id),
            ContentType::Series => series_id = Some(content.id),
        },
        Err(err) => warn!(download_id = %download.id, error = %err, "queue row references missing content"),
    }

    let cancel = CancellationToken::new();
    let (size, sizeleft, timeleft, estimated_completion_time) =
        match state.downloader.status(&cancel, &download.client_id).await {
            Ok(client_status) => {
                let sizeleft = (client_status.size - client_status.downloaded).max(0);
                let (timeleft, estimated_completion_time) =
                    estimate_remaining(download, client_status.downloaded, sizeleft);
                (client_status.size, sizeleft, timeleft, estimated_completion_time)
            }
            Err(err) => {
                warn!(download_id = %download.id, error = %err, "downloader status lookup failed, returning row without live enrichment");
                (0, 0, None, None)
            }
        };

    QueueResource {
        id: download.id,
        download_id: download.client_id.clone(),
        movie_id,
        series_id,
        episode_id: download.episode_id,
        title: download.release_name.clone(),
        status: format!("{:?}", download.status).to_lowercase(),
        size,
        sizeleft,
        timeleft,
        estimated_completion_time,
        indexer: download.indexer.clone(),
        download_client: format!("{:?}", download.client).to_lowercase(),
    }
}

/// Estimates remaining time from average throughput since the download was
/// added. Unknown once no progress has been made yet.
fn estimate_remaining(
    download: &Download,
    downloaded: i64,
    sizeleft: i64,
) -> (Option<String>, Option<String>) {
    let elapsed = Utc::now().signed_duration_since(download.added_at).num_seconds();
    if downloaded <= 0 || elapsed <= 0 || sizeleft <= 0 {
        return (None, None);
    }
    let rate = downloaded as f64 / elapsed as f64;
    if rate <= 0.0 {
        return (None, None);
    }
    let remaining_secs = (sizeleft as f64 / rate).round() as i64;
    let timeleft = format_duration(remaining_secs);
    let estimated = Utc::now() + chrono::Duration::seconds(remaining_secs);
    (Some(timeleft), Some(estimated.to_rfc3339()))
}

fn format_duration(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hh_mm_ss() {
        assert_eq!(format_duration(3661), "01:01:01");
        assert_eq!(format_duration(59), "00:00:59");
        assert_eq!(format_duration(0), "00:00:00");
    }
}
