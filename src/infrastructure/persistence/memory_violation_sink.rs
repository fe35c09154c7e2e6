use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::application::ports::{ViolationSink, ViolationSinkError};
use crate::domain::entities::ViolationRecord;

/// Violation trail kept in process memory, in insertion order
#[derive(Default)]
pub struct InMemoryViolationSink {
    records: RwLock<Vec<ViolationRecord>>,
}

impl InMemoryViolationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ViolationSink for InMemoryViolationSink {
    async fn insert(&self, record: &ViolationRecord) -> Result<(), ViolationSinkError> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ViolationRecord>, ViolationSinkError> {
        let mut records = self.records.read().clone();
        // stable sort keeps later inserts last among equal timestamps
        records.sort_by_key(|r| r.occurred_at());
        Ok(records.into_iter().rev().take(limit).collect())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, ViolationSinkError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.occurred_at() >= cutoff);
        Ok((before - records.len()) as u64)
    }
}
