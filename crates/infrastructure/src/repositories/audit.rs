//! PostgreSQL implementation of `AuditRepository`.

use crate::database::DatabasePool;
use crate::error::InfrastructureError;
use async_trait::async_trait;
use gatherarr_core::domain::repositories::AuditRepository;
use gatherarr_core::error::Result;
use gatherarr_core::events::AuditEntry;
use sqlx::Row;
use uuid::Uuid;

pub struct PostgresAuditRepository {
    pool: DatabasePool,
}

impl PostgresAuditRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Result<AuditEntry> {
        Ok(AuditEntry {
            id: row.try_get("id").map_err(InfrastructureError::from)?,
            event_type: row.try_get("event_type").map_err(InfrastructureError::from)?,
            entity_type: row.try_get("entity_type").map_err(InfrastructureError::from)?,
            entity_id: row.try_get("entity_id").map_err(InfrastructureError::from)?,
            occurred_at: row.try_get("occurred_at").map_err(InfrastructureError::from)?,
        })
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn record(&self, entry: &AuditEntry) -> Result<AuditEntry> {
        sqlx::query(
            "INSERT INTO audit_log (id, event_type, entity_type, entity_id, occurred_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.id)
        .bind(&entry.event_type)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        Ok(entry.clone())
    }

    async fn recent(&self, limit: i64, offset: i64) -> Result<(Vec<AuditEntry>, i64)> {
        let rows = sqlx::query(
            "SELECT id, event_type, entity_type, entity_id, occurred_at FROM audit_log
             ORDER BY occurred_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(Self::parse_row(row)?);
        }

        let count_row = sqlx::query("SELECT COUNT(*) as count FROM audit_log")
            .fetch_one(&self.pool)
            .await
            .map_err(InfrastructureError::from)?;
        let total: i64 = count_row.try_get("count").unwrap_or(0);

        Ok((items, total))
    }

    async fn for_entity(&self, entity_type: &str, entity_id: Uuid) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query(
            "SELECT id, event_type, entity_type, entity_id, occurred_at FROM audit_log
             WHERE entity_type = $1 AND entity_id = $2
             ORDER BY occurred_at DESC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(InfrastructureError::from)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(Self::parse_row(row)?);
        }
        Ok(items)
    }
}
