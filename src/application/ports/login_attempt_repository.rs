use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::{automock, predicate::*};
use thiserror::Error;

use crate::domain::entities::LoginAttempt;

#[derive(Debug, Error)]
pub enum AttemptRepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Attempt repository unavailable: {0}")]
    Unavailable(String),
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LoginAttemptRepository: Send + Sync {
    async fn record(&self, attempt: &LoginAttempt) -> Result<(), AttemptRepositoryError>;

    async fn count_since(
        &self,
        identifier: &str,
        action: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, AttemptRepositoryError>;

    /// Mark the newest attempt of the pair as the one that triggered a lockout
    async fn lock_latest(&self, identifier: &str, action: &str)
        -> Result<(), AttemptRepositoryError>;

    /// Time of the newest locked attempt after `since`, if any
    async fn latest_lock_since(
        &self,
        identifier: &str,
        action: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, AttemptRepositoryError>;

    async fn clear(&self, identifier: &str, action: &str) -> Result<u64, AttemptRepositoryError>;

    async fn delete_older_than(&self, cutoff: DateTime<Utc>)
        -> Result<u64, AttemptRepositoryError>;
}
