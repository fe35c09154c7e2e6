//! Fixed-window rate limiting over pluggable counting storage

mod client_ip;
mod limiter;
mod settings;

pub use client_ip::resolve_client_ip;
pub use limiter::{CountingBackend, FailurePolicy, RateLimitError, RateLimiter};
pub use settings::{RateLimitRule, RateLimitSettings, DEFAULT_MAX_WINDOW_SECS};
pub(crate) use limiter::seconds_before;
