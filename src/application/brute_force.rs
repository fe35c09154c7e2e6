//! Lockout after repeated failed attempts at a protected action

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::ports::{AttemptRepositoryError, Clock, LoginAttemptRepository};
use crate::application::rate_limiting::seconds_before;
use crate::domain::entities::LoginAttempt;
use crate::domain::value_objects::ClientContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BruteForceSettings {
    pub max_attempts: u64,
    pub lockout_seconds: u64,
    /// Failures older than this no longer count and are deleted
    pub attempt_lifetime_seconds: u64,
}

impl Default for BruteForceSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_seconds: 900,
            attempt_lifetime_seconds: 3600,
        }
    }
}

impl BruteForceSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("Brute force max attempts must be greater than 0".to_string());
        }
        if self.lockout_seconds == 0 || self.attempt_lifetime_seconds == 0 {
            return Err("Brute force periods must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// "Não bloqueado", "M minuto(s) e S segundo(s)" or "S segundo(s)"
pub fn format_remaining(seconds: u64) -> String {
    if seconds == 0 {
        return "Não bloqueado".to_string();
    }
    let minutes = seconds / 60;
    let seconds = seconds % 60;
    if minutes > 0 {
        format!("{} minuto(s) e {} segundo(s)", minutes, seconds)
    } else {
        format!("{} segundo(s)", seconds)
    }
}

pub struct BruteForceGuard {
    attempts: Arc<dyn LoginAttemptRepository>,
    clock: Arc<dyn Clock>,
    settings: BruteForceSettings,
}

impl BruteForceGuard {
    pub fn new(
        attempts: Arc<dyn LoginAttemptRepository>,
        clock: Arc<dyn Clock>,
        settings: BruteForceSettings,
    ) -> Self {
        Self {
            attempts,
            clock,
            settings,
        }
    }

    /// Record a failure; returns `true` when this failure triggered a lockout
    pub async fn register_failure(
        &self,
        identifier: &str,
        action: &str,
        client: &ClientContext,
    ) -> Result<bool, AttemptRepositoryError> {
        let attempt = LoginAttempt::failed(
            identifier,
            action,
            client.remote_addr().map(|ip| ip.to_string()),
            Some(client.user_agent().to_string()),
            self.clock.now(),
        );
        self.attempts.record(&attempt).await?;

        let count = self.attempt_count(identifier, action).await?;
        debug!(identifier, action, count, "Failed attempt recorded");
        if count < self.settings.max_attempts {
            return Ok(false);
        }

        self.attempts.lock_latest(identifier, action).await?;
        warn!(
            identifier,
            action,
            attempts = count,
            "Ação \"{}\" bloqueada para \"{}\" após {} tentativas malsucedidas.",
            action,
            identifier,
            count
        );
        Ok(true)
    }

    /// A success wipes the failure history of the pair
    pub async fn register_success(
        &self,
        identifier: &str,
        action: &str,
    ) -> Result<(), AttemptRepositoryError> {
        self.clear(identifier, action).await.map(|_| ())
    }

    pub async fn is_blocked(&self, identifier: &str, action: &str) -> Result<bool, AttemptRepositoryError> {
        Ok(self.active_lock(identifier, action).await?.is_some())
    }

    /// Failures within the attempt lifetime
    pub async fn attempt_count(&self, identifier: &str, action: &str) -> Result<u64, AttemptRepositoryError> {
        let since = seconds_before(self.clock.now(), self.settings.attempt_lifetime_seconds);
        self.attempts.count_since(identifier, action, since).await
    }

    /// Seconds until the current lockout ends, 0 when not blocked
    pub async fn remaining_lockout(&self, identifier: &str, action: &str) -> Result<u64, AttemptRepositoryError> {
        let Some(locked_at) = self.active_lock(identifier, action).await? else {
            return Ok(0);
        };
        let lockout = i64::try_from(self.settings.lockout_seconds).unwrap_or(i64::MAX);
        let elapsed = (self.clock.now() - locked_at).num_seconds();
        Ok(u64::try_from(lockout.saturating_sub(elapsed)).unwrap_or(0))
    }

    pub async fn remaining_lockout_text(
        &self,
        identifier: &str,
        action: &str,
    ) -> Result<String, AttemptRepositoryError> {
        Ok(format_remaining(self.remaining_lockout(identifier, action).await?))
    }

    pub async fn clear(&self, identifier: &str, action: &str) -> Result<u64, AttemptRepositoryError> {
        self.attempts.clear(identifier, action).await
    }

    /// Delete failures past the attempt lifetime
    pub async fn prune(&self) -> Result<u64, AttemptRepositoryError> {
        let cutoff = seconds_before(self.clock.now(), self.settings.attempt_lifetime_seconds);
        self.attempts.delete_older_than(cutoff).await
    }

    async fn active_lock(
        &self,
        identifier: &str,
        action: &str,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, AttemptRepositoryError> {
        self.prune().await?;
        let since = seconds_before(self.clock.now(), self.settings.lockout_seconds);
        self.attempts.latest_lock_since(identifier, action, since).await
    }
}
