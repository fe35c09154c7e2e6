use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::RateLimitKey;

/// Append-only audit row written whenever a rate limit rejects a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    id: Uuid,
    rate_key: String,
    identifier: String,
    user_agent: String,
    occurred_at: DateTime<Utc>,
}

impl ViolationRecord {
    pub fn new(key: &RateLimitKey, user_agent: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            rate_key: key.storage_key(),
            identifier: key.identifier().to_string(),
            user_agent: user_agent.into(),
            occurred_at,
        }
    }

    /// Reconstruct from storage
    pub fn reconstruct(
        id: Uuid,
        rate_key: String,
        identifier: String,
        user_agent: String,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            rate_key,
            identifier,
            user_agent,
            occurred_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn rate_key(&self) -> &str {
        &self.rate_key
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
