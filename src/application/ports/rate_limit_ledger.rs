use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::{automock, predicate::*};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Durable rate limiting path: one timestamped row per admitted request
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RateLimitLedger: Send + Sync {
    async fn count_since(&self, key: &str, since: DateTime<Utc>) -> Result<u64, LedgerError>;

    async fn insert(
        &self,
        key: &str,
        identifier: &str,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError>;

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, LedgerError>;
}
