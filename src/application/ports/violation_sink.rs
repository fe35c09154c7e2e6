use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::{automock, predicate::*};
use thiserror::Error;

use crate::domain::entities::ViolationRecord;

#[derive(Debug, Error)]
pub enum ViolationSinkError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Violation sink unavailable: {0}")]
    Unavailable(String),
}

/// Append-only audit trail of rate limit rejections.
///
/// Kept apart from counter storage so counter pruning never touches it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ViolationSink: Send + Sync {
    async fn insert(&self, record: &ViolationRecord) -> Result<(), ViolationSinkError>;

    /// Most recent records first
    async fn recent(&self, limit: usize) -> Result<Vec<ViolationRecord>, ViolationSinkError>;

    /// Retention purge; never called by the rate limiter itself
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, ViolationSinkError>;
}
