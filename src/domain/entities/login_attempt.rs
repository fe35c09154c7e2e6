use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One failed authentication attempt for an (identifier, action) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttempt {
    id: Uuid,
    identifier: String,
    action: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    attempted_at: DateTime<Utc>,
    /// Set on the attempt that tripped the lockout
    locked: bool,
}

impl LoginAttempt {
    pub fn failed(
        identifier: impl Into<String>,
        action: impl Into<String>,
        ip_address: Option<String>,
        user_agent: Option<String>,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier: identifier.into(),
            action: action.into(),
            ip_address,
            user_agent,
            attempted_at,
            locked: false,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: Uuid,
        identifier: String,
        action: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
        attempted_at: DateTime<Utc>,
        locked: bool,
    ) -> Self {
        Self {
            id,
            identifier,
            action,
            ip_address,
            user_agent,
            attempted_at,
            locked,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn attempted_at(&self) -> DateTime<Utc> {
        self.attempted_at
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }
}
