use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::{Clock, CounterStore, CounterStoreError};
use crate::domain::entities::CounterWindow;

/// Process-local counter store; each increment is atomic under the shard lock
pub struct InMemoryCounterStore {
    counters: DashMap<String, CounterWindow>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCounterStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: DashMap::new(),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, window_seconds: u64) -> Result<u64, CounterStoreError> {
        let now = self.clock.now();
        let mut window = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| CounterWindow::start(now, window_seconds));
        if window.is_expired(now) {
            *window = CounterWindow::start(now, window_seconds);
        }
        Ok(window.increment())
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), CounterStoreError> {
        let now = self.clock.now();
        if let Some(mut window) = self.counters.get_mut(key) {
            window.expire_after(now, seconds);
        }
        Ok(())
    }

    async fn prune_expired(&self) -> Result<u64, CounterStoreError> {
        let now = self.clock.now();
        let before = self.counters.len();
        self.counters.retain(|_, window| !window.is_expired(now));
        Ok(before.saturating_sub(self.counters.len()) as u64)
    }
}
