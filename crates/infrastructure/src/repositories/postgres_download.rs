//! PostgreSQL implementation of `DownloadRepository`.

use crate::database::DatabasePool;
use crate::error::InfrastructureError;
use async_trait::async_trait;
use gatherarr_core::domain::repositories::DownloadRepository;
use gatherarr_core::error::{CoreError, Result};
use gatherarr_core::models::{Download, DownloadClientKind, DownloadFilter, DownloadStatus, StuckThresholds};
use sqlx::{Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use uuid::Uuid;

const DOWNLOAD_COLUMNS: &str = "id, content_id, episode_id, client, client_id, status, release_name,
                                 indexer, added_at, completed_at, last_transition_at";

pub struct PostgresDownloadRepository {
    pool: DatabasePool,
}

impl PostgresDownloadRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Result<Download> {
        Ok(Download {
            id: row.try_get("id").map_err(InfrastructureError::from)?,
            content_id: row.try_get("content_id").map_err(InfrastructureError::from)?,
            episode_id: row.try_get("episode_id").map_err(InfrastructureError::from)?,
            client: row.try_get("client").map_err(InfrastructureError::from)?,
            client_id: row.try_get("client_id").map_err(InfrastructureError::from)?,
            status: row.try_get("status").map_err(InfrastructureError::from)?,
            release_name: row.try_get("release_name").map_err(InfrastructureError::from)?,
            indexer: row.try_get("indexer").map_err(InfrastructureError::from)?,
            added_at: row.try_get("added_at").map_err(InfrastructureError::from)?,
            completed_at: row.try_get("completed_at").map_err(InfrastructureError::from)?,
            last_transition_at: row.try_get("last_transition_at").map_err(InfrastructureError::from)?,
        })
    }
}

#[async_trait]
impl DownloadRepository for PostgresDownloadRepository {
    async fn add(&self, download: &Download) -> Result<Download> {
        if let Some(existing) = self
            .get_by_content_and_release(download.content_id, &download.release_name)
            .await?
        {
            return Ok(existing);
        }

        sqlx::query(&format!(
            "INSERT INTO downloads ({DOWNLOAD_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(download.id)
        .bind(download.content_id)
        .bind(download.episode_id)
        .bind(download.client)
        .bind(&download.client_id)
        .bind(download.status)
        .bind(&download.release_name)
        .bind(&download.indexer)
        .bind(download.added_at)
        .bind(download.completed_at)
        .bind(download.last_transition_at)
        .execute(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        Ok(download.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Download> {
        let row = sqlx::query(&format!("SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        match row {
            Some(row) => Self::parse_row(&row),
            None => Err(CoreError::NotFound {
                resource: format!("download {id}"),
            }),
        }
    }

    async fn list(&self, filter: &DownloadFilter) -> Result<(Vec<Download>, i64)> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {DOWNLOAD_COLUMNS} FROM downloads"));
        let mut count_builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) as count FROM downloads");

        for b in [&mut builder, &mut count_builder] {
            let mut first = true;
            macro_rules! sep {
                () => {
                    b.push(if first { " WHERE " } else { " AND " });
                    first = false;
                };
            }
            if let Some(content_id) = filter.content_id {
                sep!();
                b.push("content_id = ").push_bind(content_id);
            }
            if let Some(episode_id) = filter.episode_id {
                sep!();
                b.push("episode_id = ").push_bind(episode_id);
            }
            if let Some(status) = filter.status {
                sep!();
                b.push("status = ").push_bind(status);
            }
            if let Some(client) = filter.client {
                sep!();
                b.push("client = ").push_bind(client);
            }
            if let Some(active) = filter.active {
                sep!();
                if active {
                    b.push("status NOT IN ('failed', 'cleaned')");
                } else {
                    b.push("status IN ('failed', 'cleaned')");
                }
            }
        }

        builder.push(" ORDER BY added_at DESC LIMIT ");
        builder.push_bind(filter.limit);
        builder.push(" OFFSET ");
        builder.push_bind(filter.offset);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(Self::parse_row(row)?);
        }

        let count_row = count_builder
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;
        let total: i64 = count_row.try_get("count").unwrap_or(0);

        Ok((items, total))
    }

    async fn update(&self, download: &Download) -> Result<Download> {
        let result = sqlx::query(
            "UPDATE downloads SET content_id = $2, episode_id = $3, client = $4, client_id = $5,
             status = $6, release_name = $7, indexer = $8, completed_at = $9, last_transition_at = $10
             WHERE id = $1",
        )
        .bind(download.id)
        .bind(download.content_id)
        .bind(download.episode_id)
        .bind(download.client)
        .bind(&download.client_id)
        .bind(download.status)
        .bind(&download.release_name)
        .bind(&download.indexer)
        .bind(download.completed_at)
        .bind(download.last_transition_at)
        .execute(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound {
                resource: format!("download {}", download.id),
            });
        }

        Ok(download.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM downloads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;
        Ok(())
    }

    async fn get_by_client_id(&self, client: DownloadClientKind, client_id: &str) -> Result<Option<Download>> {
        let row = sqlx::query(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE client = $1 AND client_id = $2"
        ))
        .bind(client)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn get_by_content_and_release(&self, content_id: Uuid, release_name: &str) -> Result<Option<Download>> {
        let row = sqlx::query(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE content_id = $1 AND release_name = $2"
        ))
        .bind(content_id)
        .bind(release_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn list_stuck(&self, thresholds: &StuckThresholds) -> Result<Vec<Download>> {
        let rows = sqlx::query(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads
             WHERE (status = 'queued' AND now() - last_transition_at > $1)
                OR (status = 'downloading' AND now() - last_transition_at > $2)
                OR (status = 'completed' AND now() - last_transition_at > $3)"
        ))
        .bind(thresholds.queued)
        .bind(thresholds.downloading)
        .bind(thresholds.completed)
        .fetch_all(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(Self::parse_row(row)?);
        }
        Ok(items)
    }

    async fn count_by_status(&self) -> Result<HashMap<DownloadStatus, i64>> {
        let rows = sqlx::query("SELECT status, COUNT(*) as count FROM downloads GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        let mut counts = HashMap::new();
        for row in rows {
            let status: DownloadStatus = row.try_get("status").map_err(InfrastructureError::from)?;
            let count: i64 = row.try_get("count").map_err(InfrastructureError::from)?;
            counts.insert(status, count);
        }
        Ok(counts)
    }
}
