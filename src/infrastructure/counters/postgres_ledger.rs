use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::application::ports::{LedgerError, RateLimitLedger};

pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitLedger for PostgresLedger {
    async fn count_since(&self, key: &str, since: DateTime<Utc>) -> Result<u64, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count
            FROM rate_limit_entries
            WHERE rate_key = $1 AND created_at >= $2
            "#,
        )
        .bind(key)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn insert(
        &self,
        key: &str,
        identifier: &str,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO rate_limit_entries (rate_key, identifier, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(key)
        .bind(identifier)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, LedgerError> {
        let result = sqlx::query("DELETE FROM rate_limit_entries WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
