use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Composite counter key: the limited action and who performed it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimitKey {
    action: String,
    identifier: String,
}

impl RateLimitKey {
    const MAX_ACTION_LENGTH: usize = 64;
    const MAX_IDENTIFIER_LENGTH: usize = 255;

    pub fn new(action: impl Into<String>, identifier: impl Into<String>) -> Result<Self, DomainError> {
        let action = action.into();
        let identifier = identifier.into();

        if action.is_empty() || action.len() > Self::MAX_ACTION_LENGTH {
            return Err(DomainError::InvalidAction(format!(
                "action must be 1-{} characters",
                Self::MAX_ACTION_LENGTH
            )));
        }
        // Action names are part of the storage key and of log lines
        if !action
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(DomainError::InvalidAction(action));
        }

        if identifier.is_empty() || identifier.len() > Self::MAX_IDENTIFIER_LENGTH {
            return Err(DomainError::InvalidIdentifier(format!(
                "identifier must be 1-{} bytes",
                Self::MAX_IDENTIFIER_LENGTH
            )));
        }
        if identifier.chars().any(char::is_control) {
            return Err(DomainError::InvalidIdentifier(
                "identifier contains control characters".to_string(),
            ));
        }

        Ok(Self { action, identifier })
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Key under which counters and ledger rows are stored
    pub fn storage_key(&self) -> String {
        format!("rate_limit:{}:{}", self.action, self.identifier)
    }
}

impl std::fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rate_limit:{}:{}", self.action, self.identifier)
    }
}
