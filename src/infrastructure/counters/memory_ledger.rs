use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::application::ports::{LedgerError, RateLimitLedger};

/// Process-local ledger with the same read-then-insert semantics as the
/// relational one. Only timestamps are kept per key.
#[derive(Default)]
pub struct InMemoryLedger {
    entries: DashMap<String, Vec<DateTime<Utc>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitLedger for InMemoryLedger {
    async fn count_since(&self, key: &str, since: DateTime<Utc>) -> Result<u64, LedgerError> {
        Ok(self
            .entries
            .get(key)
            .map(|rows| rows.iter().filter(|at| **at >= since).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(
        &self,
        key: &str,
        _identifier: &str,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.entries.entry(key.to_string()).or_default().push(at);
        Ok(())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, LedgerError> {
        let mut removed = 0u64;
        self.entries.retain(|_, rows| {
            let before = rows.len();
            rows.retain(|at| *at >= cutoff);
            removed += (before - rows.len()) as u64;
            !rows.is_empty()
        });
        Ok(removed)
    }
}
