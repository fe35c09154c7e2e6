use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::application::ports::{AttemptRepositoryError, LoginAttemptRepository};
use crate::domain::entities::LoginAttempt;

#[derive(Default)]
pub struct InMemoryLoginAttemptRepository {
    attempts: RwLock<Vec<LoginAttempt>>,
}

impl InMemoryLoginAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_pair(attempt: &LoginAttempt, identifier: &str, action: &str) -> bool {
    attempt.identifier() == identifier && attempt.action() == action
}

#[async_trait]
impl LoginAttemptRepository for InMemoryLoginAttemptRepository {
    async fn record(&self, attempt: &LoginAttempt) -> Result<(), AttemptRepositoryError> {
        self.attempts.write().push(attempt.clone());
        Ok(())
    }

    async fn count_since(
        &self,
        identifier: &str,
        action: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, AttemptRepositoryError> {
        Ok(self
            .attempts
            .read()
            .iter()
            .filter(|a| same_pair(a, identifier, action) && a.attempted_at() > since)
            .count() as u64)
    }

    async fn lock_latest(&self, identifier: &str, action: &str) -> Result<(), AttemptRepositoryError> {
        let mut attempts = self.attempts.write();
        if let Some(latest) = attempts
            .iter_mut()
            .filter(|a| same_pair(a, identifier, action))
            .max_by_key(|a| a.attempted_at())
        {
            latest.lock();
        }
        Ok(())
    }

    async fn latest_lock_since(
        &self,
        identifier: &str,
        action: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, AttemptRepositoryError> {
        Ok(self
            .attempts
            .read()
            .iter()
            .filter(|a| same_pair(a, identifier, action) && a.is_locked() && a.attempted_at() > since)
            .map(|a| a.attempted_at())
            .max())
    }

    async fn clear(&self, identifier: &str, action: &str) -> Result<u64, AttemptRepositoryError> {
        let mut attempts = self.attempts.write();
        let before = attempts.len();
        attempts.retain(|a| !same_pair(a, identifier, action));
        Ok((before - attempts.len()) as u64)
    }

    async fn delete_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AttemptRepositoryError> {
        let mut attempts = self.attempts.write();
        let before = attempts.len();
        attempts.retain(|a| a.attempted_at() >= cutoff);
        Ok((before - attempts.len()) as u64)
    }
}
