//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `working_set_size` is 0
    /// - `max_age_days` is 0
    /// - `store_quota_bytes` exceeds 50MB
    /// - `debounce_ms` or `notes_debounce_ms` exceeds 30 seconds
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.working_set_size == 0 {
            return Err(ConfigError::Invalid {
                field: "working_set_size".into(),
                reason: "must be at least 1".into(),
            });
        }

        if self.max_age_days == 0 {
            return Err(ConfigError::Invalid { field: "max_age_days".into(), reason: "must be at least 1".into() });
        }

        if self.store_quota_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid {
                field: "store_quota_bytes".into(),
                reason: "must not exceed 50MB".into(),
            });
        }

        if self.debounce_ms > 30_000 {
            return Err(ConfigError::Invalid {
                field: "debounce_ms".into(),
                reason: "must not exceed 30 seconds (30000ms)".into(),
            });
        }
        if self.notes_debounce_ms > 30_000 {
            return Err(ConfigError::Invalid {
                field: "notes_debounce_ms".into(),
                reason: "must not exceed 30 seconds (30000ms)".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.auto_fetch && self.allowlist_domains.is_empty() {
            tracing::warn!(
                "auto_fetch is enabled with an empty allowlist_domains; \
                 automatic fetches will run on every domain"
            );
        }

        Ok(())
    }
}
