//! PostgreSQL implementation of `ContentRepository`.

use crate::database::DatabasePool;
use crate::error::InfrastructureError;
use async_trait::async_trait;
use gatherarr_core::domain::repositories::ContentRepository;
use gatherarr_core::error::{CoreError, Result};
use gatherarr_core::models::{Content, ContentFilter};
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

const CONTENT_COLUMNS: &str = "id, content_type, external_movie_id, external_series_id, title,
                                year, status, quality_profile, root_path, added_at, updated_at";

pub struct PostgresContentRepository {
    pool: DatabasePool,
}

impl PostgresContentRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Result<Content> {
        Ok(Content {
            id: row.try_get("id").map_err(InfrastructureError::from)?,
            content_type: row.try_get("content_type").map_err(InfrastructureError::from)?,
            external_movie_id: row.try_get("external_movie_id").map_err(InfrastructureError::from)?,
            external_series_id: row.try_get("external_series_id").map_err(InfrastructureError::from)?,
            title: row.try_get("title").map_err(InfrastructureError::from)?,
            year: row.try_get("year").map_err(InfrastructureError::from)?,
            status: row.try_get("status").map_err(InfrastructureError::from)?,
            quality_profile: row.try_get("quality_profile").map_err(InfrastructureError::from)?,
            root_path: row.try_get("root_path").map_err(InfrastructureError::from)?,
            added_at: row.try_get("added_at").map_err(InfrastructureError::from)?,
            updated_at: row.try_get("updated_at").map_err(InfrastructureError::from)?,
        })
    }

    /// Appends `WHERE` + `AND`-joined predicates shared by `list`'s row
    /// query and its count query.
    fn push_filter_clause(builder: &mut QueryBuilder<'_, Postgres>, filter: &ContentFilter) {
        let mut first = true;
        let mut sep = |builder: &mut QueryBuilder<'_, Postgres>| {
            builder.push(if first { " WHERE " } else { " AND " });
            first = false;
        };

        if let Some(content_type) = filter.content_type {
            sep(builder);
            builder.push("content_type = ").push_bind(content_type);
        }
        if let Some(status) = filter.status {
            sep(builder);
            builder.push("status = ").push_bind(status);
        }
        if let Some(ref quality_profile) = filter.quality_profile {
            sep(builder);
            builder.push("quality_profile = ").push_bind(quality_profile.clone());
        }
        if let Some(external_movie_id) = filter.external_movie_id {
            sep(builder);
            builder.push("external_movie_id = ").push_bind(external_movie_id);
        }
        if let Some(external_series_id) = filter.external_series_id {
            sep(builder);
            builder.push("external_series_id = ").push_bind(external_series_id);
        }
        if let Some(ref title) = filter.title {
            sep(builder);
            builder.push("title ILIKE ").push_bind(format!("%{title}%"));
        }
        if let Some(year) = filter.year {
            sep(builder);
            builder.push("year = ").push_bind(year);
        }
    }
}

#[async_trait]
impl ContentRepository for PostgresContentRepository {
    async fn add(&self, content: &Content) -> Result<Content> {
        sqlx::query(&format!(
            "INSERT INTO content ({CONTENT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
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
        .execute(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        Ok(content.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Content> {
        let row = sqlx::query(&format!("SELECT {CONTENT_COLUMNS} FROM content WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        match row {
            Some(row) => Self::parse_row(&row),
            None => Err(CoreError::NotFound {
                resource: format!("content {id}"),
            }),
        }
    }

    async fn list(&self, filter: &ContentFilter) -> Result<(Vec<Content>, i64)> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {CONTENT_COLUMNS} FROM content"));
        Self::push_filter_clause(&mut builder, filter);
        builder.push(" ORDER BY title ASC LIMIT ");
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

        let mut count_builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) as count FROM content");
        Self::push_filter_clause(&mut count_builder, filter);
        let count_row = count_builder
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;
        let total: i64 = count_row.try_get("count").unwrap_or(0);

        Ok((items, total))
    }

    async fn update(&self, content: &Content) -> Result<Content> {
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
        .execute(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound {
                resource: format!("content {}", content.id),
            });
        }

        Ok(content.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM content WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;
        Ok(())
    }

    async fn find_by_external_movie_id(&self, external_movie_id: i32) -> Result<Option<Content>> {
        let row = sqlx::query(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content WHERE external_movie_id = $1"
        ))
        .bind(external_movie_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn find_by_external_series_id(&self, external_series_id: i32) -> Result<Option<Content>> {
        let row = sqlx::query(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content WHERE external_series_id = $1"
        ))
        .bind(external_series_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        row.as_ref().map(Self::parse_row).transpose()
    }
}
