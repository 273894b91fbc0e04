//! `CatalogTransaction` over a single PostgreSQL connection.
//!
//! `begin` hands out an owned `sqlx::Transaction<'static, Postgres>`
//! (sqlx checks it out of the pool for the caller, same pool the plain
//! repository structs share); everything written through it is invisible
//! to other connections until `commit`, and visible to reads made through
//! the same transaction beforehand. Bound to one connection, so never
//! share a `Box<dyn CatalogTransaction>` across tasks.

use async_trait::async_trait;
use gatherarr_core::domain::repositories::CatalogTransaction;
use gatherarr_core::error::Result;
use gatherarr_core::models::{Content, Download, Episode};
use sqlx::Postgres;
use uuid::Uuid;

use crate::database::DatabasePool;
use crate::error::InfrastructureError;

const CONTENT_COLUMNS: &str = "id, content_type, external_movie_id, external_series_id, title,
                                year, status, quality_profile, root_path, added_at, updated_at";
const EPISODE_COLUMNS: &str = "id, content_id, season, episode, title, status, air_date";
const DOWNLOAD_COLUMNS: &str = "id, content_id, episode_id, client, client_id, status, release_name,
                                 indexer, added_at, completed_at, last_transition_at";

pub struct PostgresCatalogTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

/// Checks out a connection and starts a transaction against it.
pub async fn begin(pool: &DatabasePool) -> Result<Box<dyn CatalogTransaction>> {
    let tx = pool.begin().await.map_err(InfrastructureError::from)?;
    Ok(Box::new(PostgresCatalogTransaction { tx }))
}

#[async_trait]
impl CatalogTransaction for PostgresCatalogTransaction {
    async fn add_content(&mut self, content: &Content) -> Result<Content> {
        sqlx::query(&format!(
            "INSERT INTO content ({CONTENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(content.id)
        .bind(content.content_type)
        .bind(content.external_movie_id)
        .bind(content.external_series_id)
        .bind(&content.title)
        .bind(content.year)
        .bind(content.status)
        .bind(&content.quality_profile)
        .bind(&content.root_path)
        .bind(content.added_at)
        .bind(content.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(InfrastructureError::from)?;

        Ok(content.clone())
    }

    async fn update_content(&mut self, content: &Content) -> Result<Content> {
        let result = sqlx::query(
            "UPDATE content SET content_type = $2, external_movie_id = $3, external_series_id = $4,
             title = $5, year = $6, status = $7, quality_profile = $8, root_path = $9, updated_at = $10
             WHERE id = $1",
        )
        .bind(content.id)
        .bind(content.content_type)
        .bind(content.external_movie_id)
        .bind(content.external_series_id)
        .bind(&content.title)
        .bind(content.year)
        .bind(content.status)
        .bind(&content.quality_profile)
        .bind(&content.root_path)
        .bind(content.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(InfrastructureError::from)?;

        if result.rows_affected() == 0 {
            return Err(gatherarr_core::error::CoreError::NotFound {
                resource: format!("content {}", content.id),
            });
        }

        Ok(content.clone())
    }

    async fn delete_content(&mut self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM content WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(InfrastructureError::from)?;
        Ok(())
    }

    async fn add_episode(&mut self, episode: &Episode) -> Result<Episode> {
        sqlx::query(&format!(
            "INSERT INTO episodes ({EPISODE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(episode.id)
        .bind(episode.content_id)
        .bind(episode.season)
        .bind(episode.episode)
        .bind(&episode.title)
        .bind(episode.status)
        .bind(episode.air_date)
        .execute(&mut *self.tx)
        .await
        .map_err(InfrastructureError::from)?;

        Ok(episode.clone())
    }

    async fn add_download(&mut self, download: &Download) -> Result<Download> {
        let existing = sqlx::query(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE content_id = $1 AND release_name = $2"
        ))
        .bind(download.content_id)
        .bind(&download.release_name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(InfrastructureError::from)?;

        if let Some(row) = existing {
            return parse_download_row(&row);
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
        .execute(&mut *self.tx)
        .await
        .map_err(InfrastructureError::from)?;

        Ok(download.clone())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(InfrastructureError::from)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(InfrastructureError::from)?;
        Ok(())
    }
}

fn parse_download_row(row: &sqlx::postgres::PgRow) -> Result<Download> {
    use sqlx::Row;
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
