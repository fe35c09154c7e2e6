use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

/// Source of "now" for window and lockout arithmetic
#[cfg_attr(test, automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
