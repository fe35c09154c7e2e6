use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::application::ports::{AttemptRepositoryError, LoginAttemptRepository};
use crate::domain::entities::LoginAttempt;
use crate::infrastructure::persistence::QueryBuilder;

pub struct PostgresLoginAttemptRepository {
    pool: PgPool,
}

impl PostgresLoginAttemptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoginAttemptRepository for PostgresLoginAttemptRepository {
    async fn record(&self, attempt: &LoginAttempt) -> Result<(), AttemptRepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO login_attempts (
                id, identifier, action, ip_address, user_agent, attempted_at, locked
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(attempt.id())
        .bind(attempt.identifier())
        .bind(attempt.action())
        .bind(attempt.ip_address())
        .bind(attempt.user_agent())
        .bind(attempt.attempted_at())
        .bind(attempt.is_locked())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_since(
        &self,
        identifier: &str,
        action: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, AttemptRepositoryError> {
        let query = format!(
            "SELECT COUNT(*) AS count FROM login_attempts {} AND attempted_at > $3",
            QueryBuilder::ATTEMPT_PAIR_WHERE
        );
        let row = sqlx::query(&query)
            .bind(identifier)
            .bind(action)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn lock_latest(&self, identifier: &str, action: &str) -> Result<(), AttemptRepositoryError> {
        let query = format!(
            r#"
            UPDATE login_attempts SET locked = TRUE
            WHERE id = (
                SELECT id FROM login_attempts {}
                ORDER BY attempted_at DESC
                LIMIT 1
            )
            "#,
            QueryBuilder::ATTEMPT_PAIR_WHERE
        );
        sqlx::query(&query)
            .bind(identifier)
            .bind(action)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn latest_lock_since(
        &self,
        identifier: &str,
        action: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, AttemptRepositoryError> {
        let query = format!(
            r#"
            SELECT MAX(attempted_at) AS locked_at FROM login_attempts
            {} AND locked AND attempted_at > $3
            "#,
            QueryBuilder::ATTEMPT_PAIR_WHERE
        );
        let row = sqlx::query(&query)
            .bind(identifier)
            .bind(action)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("locked_at")?)
    }

    async fn clear(&self, identifier: &str, action: &str) -> Result<u64, AttemptRepositoryError> {
        let query = format!(
            "DELETE FROM login_attempts {}",
            QueryBuilder::ATTEMPT_PAIR_WHERE
        );
        let result = sqlx::query(&query)
            .bind(identifier)
            .bind(action)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AttemptRepositoryError> {
        let result = sqlx::query("DELETE FROM login_attempts WHERE attempted_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
