use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

pub const DEFAULT_MAX_WINDOW_SECS: u64 = 86_400;

/// Window and ceiling for one action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RateLimitRule {
    #[serde(rename = "window")]
    #[validate(range(min = 1))]
    pub window_seconds: u64,

    #[validate(range(min = 1))]
    pub max_attempts: u64,
}

impl RateLimitRule {
    pub const fn new(window_seconds: u64, max_attempts: u64) -> Self {
        Self {
            window_seconds,
            max_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Ledger rows older than this are pruned, whatever the key's own window
    pub max_window_seconds: u64,
    pub log_violations: bool,
    /// Headers allowed to override the peer address, in priority order.
    /// Empty means the peer address is always used.
    pub trusted_ip_headers: Vec<String>,
    /// Per-action overrides; these win over the values passed by the caller
    pub limits: HashMap<String, RateLimitRule>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        let limits = HashMap::from([
            ("api_status_check".to_string(), RateLimitRule::new(60, 30)),
            ("login_attempt".to_string(), RateLimitRule::new(300, 5)),
            ("password_reset".to_string(), RateLimitRule::new(3600, 3)),
        ]);
        Self {
            max_window_seconds: DEFAULT_MAX_WINDOW_SECS,
            log_violations: true,
            trusted_ip_headers: Vec::new(),
            limits,
        }
    }
}

impl RateLimitSettings {
    /// Window and ceiling to apply: a configured rule replaces the call-site values
    pub fn effective_rule(&self, action: &str, window_seconds: u64, max_attempts: u64) -> RateLimitRule {
        self.limits
            .get(action)
            .copied()
            .unwrap_or(RateLimitRule::new(window_seconds, max_attempts))
    }

    /// Parse per-action overrides from TOML tables:
    ///
    /// ```toml
    /// [login_attempt]
    /// window = 300
    /// max_attempts = 5
    /// ```
    pub fn parse_limits(toml_text: &str) -> Result<HashMap<String, RateLimitRule>, String> {
        let limits: HashMap<String, RateLimitRule> =
            toml::from_str(toml_text).map_err(|e| format!("Invalid rate limit file: {}", e))?;
        for (action, rule) in &limits {
            rule.validate()
                .map_err(|e| format!("Invalid rate limit for '{}': {}", action, e))?;
        }
        Ok(limits)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_window_seconds == 0 {
            return Err("RATE_LIMIT_MAX_WINDOW_SECS must be greater than 0".to_string());
        }
        for (action, rule) in &self.limits {
            rule.validate()
                .map_err(|e| format!("Invalid rate limit for '{}': {}", action, e))?;
            if rule.window_seconds > self.max_window_seconds {
                return Err(format!(
                    "Window for '{}' ({}s) exceeds the pruning window ({}s)",
                    action, rule.window_seconds, self.max_window_seconds
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RateLimitSettings::default();
        assert_eq!(settings.max_window_seconds, 86_400);
        assert!(settings.log_violations);
        assert!(settings.trusted_ip_headers.is_empty());
        assert_eq!(settings.limits["login_attempt"], RateLimitRule::new(300, 5));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_configured_rule_wins() {
        let settings = RateLimitSettings::default();
        assert_eq!(
            settings.effective_rule("password_reset", 10, 100),
            RateLimitRule::new(3600, 3)
        );
        assert_eq!(
            settings.effective_rule("upload", 10, 100),
            RateLimitRule::new(10, 100)
        );
    }

    #[test]
    fn test_parse_limits() {
        let limits = RateLimitSettings::parse_limits(
            "[upload]\nwindow = 60\nmax_attempts = 10\n\n[search]\nwindow = 1\nmax_attempts = 20\n",
        )
        .unwrap();
        assert_eq!(limits["upload"], RateLimitRule::new(60, 10));
        assert_eq!(limits["search"].max_attempts, 20);
    }

    #[test]
    fn test_parse_limits_rejects_zero() {
        let err = RateLimitSettings::parse_limits("[upload]\nwindow = 0\nmax_attempts = 10\n")
            .unwrap_err();
        assert!(err.contains("upload"));
        assert!(RateLimitSettings::parse_limits("not toml [").is_err());
    }

    #[test]
    fn test_window_longer_than_pruning_rejected() {
        let mut settings = RateLimitSettings::default();
        settings.max_window_seconds = 120;
        assert!(settings.validate().is_err());
    }
}
