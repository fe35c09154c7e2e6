use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::client_ip::resolve_client_ip;
use super::settings::{RateLimitRule, RateLimitSettings};
use crate::application::ports::{
    Clock, CounterStore, CounterStoreError, LedgerError, RateLimitLedger, ViolationSink,
    ViolationSinkError,
};
use crate::domain::entities::ViolationRecord;
use crate::domain::errors::DomainError;
use crate::domain::value_objects::{ClientContext, RateLimitKey};

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Invalid rate limit key: {0}")]
    Key(#[from] DomainError),

    #[error("Counter store error: {0}")]
    Counter(#[from] CounterStoreError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Violation sink error: {0}")]
    Audit(#[from] ViolationSinkError),
}

/// What to answer when the counting or audit storage fails.
///
/// No `Default`: every call site picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Reject the request; for logins, resets and anything security sensitive
    FailClosed,
    /// Let the request through; only for non-sensitive actions
    FailOpen,
}

/// Where admitted requests are counted
#[derive(Clone)]
pub enum CountingBackend {
    /// Atomic increment with expiry
    Counter(Arc<dyn CounterStore>),
    /// Read-then-insert over timestamped rows, pruned on every check.
    /// Concurrent checks may overshoot the ceiling slightly, never undershoot.
    Ledger(Arc<dyn RateLimitLedger>),
}

/// Fixed-window rate limiter.
///
/// Windows are fixed, not sliding: a burst straddling a window boundary can
/// admit up to twice the ceiling across the two windows.
pub struct RateLimiter {
    backend: CountingBackend,
    violations: Arc<dyn ViolationSink>,
    clock: Arc<dyn Clock>,
    settings: RateLimitSettings,
}

impl RateLimiter {
    pub fn new(
        backend: CountingBackend,
        violations: Arc<dyn ViolationSink>,
        clock: Arc<dyn Clock>,
        settings: RateLimitSettings,
    ) -> Self {
        Self {
            backend,
            violations,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &RateLimitSettings {
        &self.settings
    }

    /// Count one request for `action` and report whether it is within the limit.
    ///
    /// `identifier` defaults to the client address. Every rejection is
    /// written to the violation sink.
    pub async fn check(
        &self,
        action: &str,
        window_seconds: u64,
        max_attempts: u64,
        identifier: Option<&str>,
        client: &ClientContext,
    ) -> Result<bool, RateLimitError> {
        let identifier = match identifier {
            Some(id) => id.to_string(),
            None => resolve_client_ip(client, &self.settings.trusted_ip_headers),
        };
        let key = RateLimitKey::new(action, identifier)?;
        let rule = self
            .settings
            .effective_rule(action, window_seconds, max_attempts);

        let allowed = match &self.backend {
            CountingBackend::Counter(store) => self.check_counter(store.as_ref(), &key, rule).await?,
            CountingBackend::Ledger(ledger) => self.check_ledger(ledger.as_ref(), &key, rule).await?,
        };

        if !allowed {
            self.record_violation(&key, client).await?;
        }
        Ok(allowed)
    }

    /// [`RateLimiter::check`] with storage failures resolved by `policy`.
    /// A malformed key is always rejected.
    pub async fn check_or(
        &self,
        policy: FailurePolicy,
        action: &str,
        window_seconds: u64,
        max_attempts: u64,
        identifier: Option<&str>,
        client: &ClientContext,
    ) -> bool {
        match self
            .check(action, window_seconds, max_attempts, identifier, client)
            .await
        {
            Ok(allowed) => allowed,
            Err(RateLimitError::Key(e)) => {
                warn!(action, error = %e, "Rejecting request with malformed rate limit key");
                false
            }
            Err(e) => {
                error!(action, error = %e, ?policy, "Rate limiter unavailable");
                policy == FailurePolicy::FailOpen
            }
        }
    }

    async fn check_counter(
        &self,
        store: &dyn CounterStore,
        key: &RateLimitKey,
        rule: RateLimitRule,
    ) -> Result<bool, RateLimitError> {
        let storage_key = key.storage_key();
        let count = store.increment(&storage_key, rule.window_seconds).await?;
        debug!(key = %storage_key, count, max = rule.max_attempts, "Rate limit counter");
        Ok(count <= rule.max_attempts)
    }

    async fn check_ledger(
        &self,
        ledger: &dyn RateLimitLedger,
        key: &RateLimitKey,
        rule: RateLimitRule,
    ) -> Result<bool, RateLimitError> {
        let now = self.clock.now();
        let storage_key = key.storage_key();

        ledger
            .delete_older_than(seconds_before(now, self.settings.max_window_seconds))
            .await?;

        let count = ledger
            .count_since(&storage_key, seconds_before(now, rule.window_seconds))
            .await?;
        debug!(key = %storage_key, count, max = rule.max_attempts, "Rate limit ledger");
        if count >= rule.max_attempts {
            return Ok(false);
        }

        ledger.insert(&storage_key, key.identifier(), now).await?;
        Ok(true)
    }

    async fn record_violation(
        &self,
        key: &RateLimitKey,
        client: &ClientContext,
    ) -> Result<(), RateLimitError> {
        let record = ViolationRecord::new(key, client.user_agent(), self.clock.now());
        self.violations.insert(&record).await?;

        if self.settings.log_violations {
            warn!(
                key = %record.rate_key(),
                client_ip = %resolve_client_ip(client, &self.settings.trusted_ip_headers),
                "RATE LIMIT VIOLATION"
            );
        }
        Ok(())
    }

    /// Drop expired counters or ledger rows outside the pruning window
    pub async fn prune(&self) -> Result<u64, RateLimitError> {
        let removed = match &self.backend {
            CountingBackend::Counter(store) => store.prune_expired().await?,
            CountingBackend::Ledger(ledger) => {
                let cutoff = seconds_before(self.clock.now(), self.settings.max_window_seconds);
                ledger.delete_older_than(cutoff).await?
            }
        };
        debug!(removed, "Pruned rate limit storage");
        Ok(removed)
    }

    /// Most recent violations, newest first
    pub async fn recent_violations(
        &self,
        limit: usize,
    ) -> Result<Vec<ViolationRecord>, RateLimitError> {
        Ok(self.violations.recent(limit).await?)
    }

    /// Retention purge of the audit trail
    pub async fn purge_violations(&self, retention_seconds: u64) -> Result<u64, RateLimitError> {
        let cutoff = seconds_before(self.clock.now(), retention_seconds);
        Ok(self.violations.purge_older_than(cutoff).await?)
    }
}

/// `now - seconds`, clamped to the earliest representable instant
pub(crate) fn seconds_before(now: DateTime<Utc>, seconds: u64) -> DateTime<Utc> {
    let span = i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX);
    now.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
