use async_trait::async_trait;
#[cfg(test)]
use mockall::{automock, predicate::*};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CounterStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Counter store unavailable: {0}")]
    Unavailable(String),
}

/// Atomic counters with expiry: the fast rate limiting path
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment and return the new value in one atomic step.
    ///
    /// A new or lapsed counter starts a window expiring `window_seconds`
    /// later in that same step, so no counter exists without an expiry.
    async fn increment(&self, key: &str, window_seconds: u64) -> Result<u64, CounterStoreError>;

    /// Move the expiry of an existing counter to `seconds` from now
    async fn expire(&self, key: &str, seconds: u64) -> Result<(), CounterStoreError>;

    /// Drop expired counters, returning how many were removed
    async fn prune_expired(&self) -> Result<u64, CounterStoreError>;
}
