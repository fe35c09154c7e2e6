use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::application::brute_force::BruteForceSettings;
use crate::application::rate_limiting::RateLimitSettings;
use crate::application::upload_gate::{GENERIC_MAX_SIZE, MODEL_MAX_SIZE};
use crate::domain::inspection::InspectorConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means in-memory counters, violations and attempts
    pub database_url: Option<String>,
    pub upload_root: PathBuf,
    pub generic_max_upload_bytes: u64,
    pub model_max_upload_bytes: u64,
    pub rate_limit: RateLimitSettings,
    pub brute_force: BruteForceSettings,
    pub inspector: InspectorConfig,
    // Database connection pool settings
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut rate_limit = RateLimitSettings {
            max_window_seconds: env_or("RATE_LIMIT_MAX_WINDOW_SECS", 86_400),
            log_violations: env_or("RATE_LIMIT_LOG_VIOLATIONS", true),
            trusted_ip_headers: std::env::var("TRUSTED_IP_HEADERS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|h| !h.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            ..RateLimitSettings::default()
        };
        if let Ok(path) = std::env::var("RATE_LIMITS_FILE") {
            let path = PathBuf::from(path);
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            // File entries override the built-in defaults action by action
            rate_limit
                .limits
                .extend(RateLimitSettings::parse_limits(&text).map_err(ConfigError::Invalid)?);
        }

        let defaults = BruteForceSettings::default();
        let brute_force = BruteForceSettings {
            max_attempts: env_or("BRUTE_FORCE_MAX_ATTEMPTS", defaults.max_attempts),
            lockout_seconds: env_or("BRUTE_FORCE_LOCKOUT_SECS", defaults.lockout_seconds),
            attempt_lifetime_seconds: env_or(
                "BRUTE_FORCE_ATTEMPT_LIFETIME_SECS",
                defaults.attempt_lifetime_seconds,
            ),
        };

        let inspector_defaults = InspectorConfig::default();
        let inspector = InspectorConfig {
            strict_validation: env_or(
                "INSPECTOR_STRICT_VALIDATION",
                inspector_defaults.strict_validation,
            ),
            max_stl_triangles: env_or("MAX_STL_TRIANGLES", inspector_defaults.max_stl_triangles),
            ..inspector_defaults
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            upload_root: std::env::var("UPLOAD_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            generic_max_upload_bytes: env_or("GENERIC_MAX_UPLOAD_BYTES", GENERIC_MAX_SIZE),
            model_max_upload_bytes: env_or("MODEL_MAX_UPLOAD_BYTES", MODEL_MAX_SIZE),
            rate_limit,
            brute_force,
            inspector,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            db_min_connections: env_or("DB_MIN_CONNECTIONS", 1),
            db_acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 30),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err("DATABASE_URL must start with postgres:// or postgresql://".to_string());
            }
        }

        if self.upload_root.as_os_str().is_empty() {
            return Err("UPLOAD_ROOT cannot be empty".to_string());
        }

        if self.generic_max_upload_bytes == 0 || self.model_max_upload_bytes == 0 {
            return Err("Upload size limits must be greater than 0".to_string());
        }

        if self.db_min_connections > self.db_max_connections {
            return Err("DB_MIN_CONNECTIONS cannot exceed DB_MAX_CONNECTIONS".to_string());
        }

        self.rate_limit.validate()?;
        self.brute_force.validate()?;
        self.inspector.validate()?;

        Ok(())
    }
}
