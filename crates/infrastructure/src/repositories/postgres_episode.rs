//! PostgreSQL implementation of `EpisodeRepository`.

use crate::database::DatabasePool;
use crate::error::InfrastructureError;
use async_trait::async_trait;
use gatherarr_core::domain::repositories::EpisodeRepository;
use gatherarr_core::error::{CoreError, Result};
use gatherarr_core::models::{Episode, EpisodeFilter, SeriesStats};
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

const EPISODE_COLUMNS: &str = "id, content_id, season, episode, title, status, air_date";

pub struct PostgresEpisodeRepository {
    pool: DatabasePool,
}

impl PostgresEpisodeRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Result<Episode> {
        Ok(Episode {
            id: row.try_get("id").map_err(InfrastructureError::from)?,
            content_id: row.try_get("content_id").map_err(InfrastructureError::from)?,
            season: row.try_get("season").map_err(InfrastructureError::from)?,
            episode: row.try_get("episode").map_err(InfrastructureError::from)?,
            title: row.try_get("title").map_err(InfrastructureError::from)?,
            status: row.try_get("status").map_err(InfrastructureError::from)?,
            air_date: row.try_get("air_date").map_err(InfrastructureError::from)?,
        })
    }
}

#[async_trait]
impl EpisodeRepository for PostgresEpisodeRepository {
    async fn add(&self, episode: &Episode) -> Result<Episode> {
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
        .execute(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        Ok(episode.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Episode> {
        let row = sqlx::query(&format!("SELECT {EPISODE_COLUMNS} FROM episodes WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;

        match row {
            Some(row) => Self::parse_row(&row),
            None => Err(CoreError::NotFound {
                resource: format!("episode {id}"),
            }),
        }
    }

    async fn list(&self, filter: &EpisodeFilter) -> Result<(Vec<Episode>, i64)> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {EPISODE_COLUMNS} FROM episodes"));
        let mut count_builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) as count FROM episodes");

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
            if let Some(season) = filter.season {
                sep!();
                b.push("season = ").push_bind(season);
            }
            if let Some(status) = filter.status {
                sep!();
                b.push("status = ").push_bind(status);
            }
        }

        builder.push(" ORDER BY season ASC, episode ASC LIMIT ");
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

    async fn update(&self, episode: &Episode) -> Result<Episode> {
        let result = sqlx::query(
            "UPDATE episodes SET season = $2, episode = $3, title = $4, status = $5, air_date = $6
             WHERE id = $1",
        )
        .bind(episode.id)
        .bind(episode.season)
        .bind(episode.episode)
        .bind(&episode.title)
        .bind(episode.status)
        .bind(episode.air_date)
        .execute(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound {
                resource: format!("episode {}", episode.id),
            });
        }

        Ok(episode.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM episodes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;
        Ok(())
    }

    async fn find_or_create(
        &self,
        content_id: Uuid,
        season: i32,
        episode: i32,
        title: &str,
    ) -> Result<(Episode, bool)> {
        let existing = sqlx::query(&format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes WHERE content_id = $1 AND season = $2 AND episode = $3"
        ))
        .bind(content_id)
        .bind(season)
        .bind(episode)
        .fetch_optional(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        if let Some(row) = existing {
            return Ok((Self::parse_row(&row)?, false));
        }

        let created = Episode::new(content_id, season, episode, title);
        let created = self.add(&created).await?;
        Ok((created, true))
    }

    /// Bulk insert-or-ignore via `UNNEST`; conflicting `(content_id, season,
    /// episode)` rows are left untouched.
    async fn bulk_add(&self, episodes: &[Episode]) -> Result<i64> {
        if episodes.is_empty() {
            return Ok(0);
        }

        let ids: Vec<Uuid> = episodes.iter().map(|e| e.id).collect();
        let content_ids: Vec<Uuid> = episodes.iter().map(|e| e.content_id).collect();
        let seasons: Vec<i32> = episodes.iter().map(|e| e.season).collect();
        let episode_numbers: Vec<i32> = episodes.iter().map(|e| e.episode).collect();
        let titles: Vec<&str> = episodes.iter().map(|e| e.title.as_str()).collect();
        let statuses: Vec<_> = episodes.iter().map(|e| e.status).collect();
        let air_dates: Vec<_> = episodes.iter().map(|e| e.air_date).collect();

        let result = sqlx::query(
            "INSERT INTO episodes (id, content_id, season, episode, title, status, air_date)
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::int[], $4::int[], $5::text[],
                                  $6::content_status[], $7::timestamptz[])
             ON CONFLICT (content_id, season, episode) DO NOTHING",
        )
        .bind(&ids)
        .bind(&content_ids)
        .bind(&seasons)
        .bind(&episode_numbers)
        .bind(&titles)
        .bind(&statuses)
        .bind(&air_dates)
        .execute(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        Ok(result.rows_affected() as i64)
    }

    async fn get_series_stats(&self, content_id: Uuid) -> Result<SeriesStats> {
        let row = sqlx::query(
            "SELECT content_id,
                    COUNT(*) as total_episodes,
                    COUNT(*) FILTER (WHERE status = 'available') as available_episodes,
                    COUNT(DISTINCT season) as season_count
             FROM episodes WHERE content_id = $1
             GROUP BY content_id",
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        match row {
            Some(row) => Ok(SeriesStats {
                content_id: row.try_get("content_id").map_err(InfrastructureError::from)?,
                total_episodes: row.try_get("total_episodes").map_err(InfrastructureError::from)?,
                available_episodes: row.try_get("available_episodes").map_err(InfrastructureError::from)?,
                season_count: row.try_get("season_count").map_err(InfrastructureError::from)?,
            }),
            None => Ok(SeriesStats {
                content_id,
                total_episodes: 0,
                available_episodes: 0,
                season_count: 0,
            }),
        }
    }

    async fn get_series_stats_batch(&self, content_ids: &[Uuid]) -> Result<Vec<SeriesStats>> {
        if content_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT content_id,
                    COUNT(*) as total_episodes,
                    COUNT(*) FILTER (WHERE status = 'available') as available_episodes,
                    COUNT(DISTINCT season) as season_count
             FROM episodes WHERE content_id = ANY($1)
             GROUP BY content_id",
        )
        .bind(content_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        let mut stats = Vec::with_capacity(rows.len());
        for row in rows {
            stats.push(SeriesStats {
                content_id: row.try_get("content_id").map_err(InfrastructureError::from)?,
                total_episodes: row.try_get("total_episodes").map_err(InfrastructureError::from)?,
                available_episodes: row.try_get("available_episodes").map_err(InfrastructureError::from)?,
                season_count: row.try_get("season_count").map_err(InfrastructureError::from)?,
            });
        }
        Ok(stats)
    }
}
