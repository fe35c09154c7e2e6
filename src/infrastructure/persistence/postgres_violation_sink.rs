use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::application::ports::{ViolationSink, ViolationSinkError};
use crate::domain::entities::ViolationRecord;
use crate::infrastructure::persistence::QueryBuilder;

pub struct PostgresViolationSink {
    pool: PgPool,
}

impl PostgresViolationSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &PgRow) -> Result<ViolationRecord, sqlx::Error> {
        Ok(ViolationRecord::reconstruct(
            row.try_get("id")?,
            row.try_get("rate_key")?,
            row.try_get("identifier")?,
            row.try_get("user_agent")?,
            row.try_get("occurred_at")?,
        ))
    }
}

#[async_trait]
impl ViolationSink for PostgresViolationSink {
    async fn insert(&self, record: &ViolationRecord) -> Result<(), ViolationSinkError> {
        sqlx::query(
            r#"
            INSERT INTO rate_limit_violations (id, rate_key, identifier, user_agent, occurred_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id())
        .bind(record.rate_key())
        .bind(record.identifier())
        .bind(record.user_agent())
        .bind(record.occurred_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ViolationRecord>, ViolationSinkError> {
        let query = format!(
            "{} ORDER BY occurred_at DESC LIMIT $1",
            QueryBuilder::VIOLATION_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .iter()
            .map(Self::row_to_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, ViolationSinkError> {
        let result = sqlx::query("DELETE FROM rate_limit_violations WHERE occurred_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
