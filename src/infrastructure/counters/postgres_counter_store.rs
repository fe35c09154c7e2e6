use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::application::ports::{CounterStore, CounterStoreError};

/// Atomic counters in one row per key; expiry is evaluated by the database clock
pub struct PostgresCounterStore {
    pool: PgPool,
}

impl PostgresCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterStore for PostgresCounterStore {
    async fn increment(&self, key: &str, window_seconds: u64) -> Result<u64, CounterStoreError> {
        // A lapsed row restarts at 1 with a fresh window, like a new key.
        // Rows without expiry (written by older versions) get one here.
        let row = sqlx::query(
            r#"
            INSERT INTO rate_limit_counters (rate_key, count, window_start, expires_at)
            VALUES ($1, 1, NOW(), NOW() + make_interval(secs => $2))
            ON CONFLICT (rate_key) DO UPDATE SET
                count = CASE
                    WHEN rate_limit_counters.expires_at <= NOW() THEN 1
                    ELSE rate_limit_counters.count + 1
                END,
                window_start = CASE
                    WHEN rate_limit_counters.expires_at <= NOW() THEN NOW()
                    ELSE rate_limit_counters.window_start
                END,
                expires_at = CASE
                    WHEN rate_limit_counters.expires_at IS NULL
                        OR rate_limit_counters.expires_at <= NOW() THEN EXCLUDED.expires_at
                    ELSE rate_limit_counters.expires_at
                END
            RETURNING count
            "#,
        )
        .bind(key)
        .bind(window_seconds as f64)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), CounterStoreError> {
        sqlx::query(
            r#"
            UPDATE rate_limit_counters
            SET expires_at = NOW() + make_interval(secs => $2)
            WHERE rate_key = $1
            "#,
        )
        .bind(key)
        .bind(seconds as f64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn prune_expired(&self) -> Result<u64, CounterStoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM rate_limit_counters
            WHERE expires_at IS NOT NULL AND expires_at <= NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
