use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fixed-window counter for one rate limit key.
///
/// Created by the first hit in a window and only ever incremented; it is
/// replaced, not decremented, once its expiry has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterWindow {
    count: u64,
    window_start: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl CounterWindow {
    pub fn start(now: DateTime<Utc>, window_seconds: u64) -> Self {
        let mut window = Self {
            count: 0,
            window_start: now,
            expires_at: None,
        };
        window.expire_after(now, window_seconds);
        window
    }

    pub fn reconstruct(
        count: u64,
        window_start: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            count,
            window_start,
            expires_at,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn expire_after(&mut self, now: DateTime<Utc>, seconds: u64) {
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        self.expires_at = Some(
            now.checked_add_signed(Duration::seconds(seconds))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
    }

    /// A counter without expiry never lapses
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Bump the counter and return the new value
    pub fn increment(&mut self) -> u64 {
        self.count = self.count.saturating_add(1);
        self.count
    }
}
