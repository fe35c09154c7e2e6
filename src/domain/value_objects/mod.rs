mod client_context;
mod content_hash;
mod rate_limit_key;

pub use client_context::ClientContext;
pub use content_hash::ContentHash;
pub use rate_limit_key::RateLimitKey;
