//! PostgreSQL implementation of `FileRepository`.

use crate::database::DatabasePool;
use crate::error::InfrastructureError;
use async_trait::async_trait;
use gatherarr_core::domain::repositories::FileRepository;
use gatherarr_core::error::{CoreError, Result};
use gatherarr_core::models::{FileFilter, MediaFile};
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

const FILE_COLUMNS: &str = "f.id, f.content_id, f.episode_id, f.path, f.size_bytes, f.quality, f.source, f.added_at";

pub struct PostgresFileRepository {
    pool: DatabasePool,
}

impl PostgresFileRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Result<MediaFile> {
        Ok(MediaFile {
            id: row.try_get("id").map_err(InfrastructureError::from)?,
            content_id: row.try_get("content_id").map_err(InfrastructureError::from)?,
            episode_id: row.try_get("episode_id").map_err(InfrastructureError::from)?,
            path: row.try_get("path").map_err(InfrastructureError::from)?,
            size_bytes: row.try_get("size_bytes").map_err(InfrastructureError::from)?,
            quality: row.try_get("quality").map_err(InfrastructureError::from)?,
            source: row.try_get("source").map_err(InfrastructureError::from)?,
            added_at: row.try_get("added_at").map_err(InfrastructureError::from)?,
        })
    }
}

#[async_trait]
impl FileRepository for PostgresFileRepository {
    async fn add(&self, file: &MediaFile) -> Result<MediaFile> {
        sqlx::query(
            "INSERT INTO files (id, content_id, episode_id, path, size_bytes, quality, source, added_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(file.id)
        .bind(file.content_id)
        .bind(file.episode_id)
        .bind(&file.path)
        .bind(file.size_bytes)
        .bind(&file.quality)
        .bind(&file.source)
        .bind(file.added_at)
        .execute(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        Ok(file.clone())
    }

    async fn get(&self, id: Uuid) -> Result<MediaFile> {
        let row = sqlx::query(&format!("SELECT {FILE_COLUMNS} FROM files f WHERE f.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        match row {
            Some(row) => Self::parse_row(&row),
            None => Err(CoreError::NotFound {
                resource: format!("file {id}"),
            }),
        }
    }

    async fn list(&self, filter: &FileFilter) -> Result<(Vec<MediaFile>, i64)> {
        let base = format!("SELECT {FILE_COLUMNS} FROM files f");
        let count_base = "SELECT COUNT(*) as count FROM files f".to_string();
        // `season` joins through episodes; only add the join when needed.
        let needs_join = filter.season.is_some();
        let from_clause = if needs_join { " JOIN episodes e ON e.id = f.episode_id" } else { "" };

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("{base}{from_clause}"));
        let mut count_builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("{count_base}{from_clause}"));

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
                b.push("f.content_id = ").push_bind(content_id);
            }
            if let Some(episode_id) = filter.episode_id {
                sep!();
                b.push("f.episode_id = ").push_bind(episode_id);
            }
            if let Some(season) = filter.season {
                sep!();
                b.push("e.season = ").push_bind(season);
            }
            if let Some(ref quality) = filter.quality {
                sep!();
                b.push("f.quality = ").push_bind(quality.clone());
            }
        }

        builder.push(" ORDER BY f.added_at DESC LIMIT ");
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

    async fn update(&self, file: &MediaFile) -> Result<MediaFile> {
        let result = sqlx::query(
            "UPDATE files SET content_id = $2, episode_id = $3, path = $4, size_bytes = $5,
             quality = $6, source = $7 WHERE id = $1",
        )
        .bind(file.id)
        .bind(file.content_id)
        .bind(file.episode_id)
        .bind(&file.path)
        .bind(file.size_bytes)
        .bind(&file.quality)
        .bind(&file.source)
        .execute(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound {
                resource: format!("file {}", file.id),
            });
        }

        Ok(file.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;
        Ok(())
    }
}
