//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SIDELINE_*)
//! 2. TOML config file (if SIDELINE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SIDELINE_*)
/// 2. TOML config file (if SIDELINE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite store backing the caches.
    ///
    /// Set via SIDELINE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Byte budget for the persistent store; 0 means unbounded.
    ///
    /// Set via SIDELINE_STORE_QUOTA_BYTES environment variable.
    #[serde(default = "default_store_quota_bytes")]
    pub store_quota_bytes: u64,

    /// Maximum number of page entries held in memory.
    ///
    /// Set via SIDELINE_WORKING_SET_SIZE environment variable.
    #[serde(default = "default_working_set_size")]
    pub working_set_size: usize,

    /// Days before a cached page entry is distrusted.
    ///
    /// Set via SIDELINE_MAX_AGE_DAYS environment variable.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,

    /// Hours before a cached author profile expires.
    ///
    /// Set via SIDELINE_PROFILE_TTL_HOURS environment variable.
    #[serde(default = "default_profile_ttl_hours")]
    pub profile_ttl_hours: u64,

    /// Quiet window for automatic fetches on rapid URL changes.
    ///
    /// Set via SIDELINE_DEBOUNCE_MS environment variable.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Quiet window for the (slower) notes source.
    ///
    /// Set via SIDELINE_NOTES_DEBOUNCE_MS environment variable.
    #[serde(default = "default_notes_debounce_ms")]
    pub notes_debounce_ms: u64,

    /// Whether URL changes may trigger fetches without a manual action.
    ///
    /// Set via SIDELINE_AUTO_FETCH environment variable.
    #[serde(default = "default_true")]
    pub auto_fetch: bool,

    /// Domains on which automatic fetches are permitted.
    ///
    /// Empty means every domain passes this gate. Set via
    /// SIDELINE_ALLOWLIST_DOMAINS environment variable (comma-separated).
    #[serde(default)]
    pub allowlist_domains: Vec<String>,

    /// API key for the content index.
    ///
    /// Set via SIDELINE_INDEX_API_KEY environment variable. Required only
    /// when the index source is used.
    #[serde(default)]
    pub index_api_key: Option<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SIDELINE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SIDELINE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sideline-cache.sqlite")
}

fn default_store_quota_bytes() -> u64 {
    5_242_880 // 5MB
}

fn default_working_set_size() -> usize {
    20
}

fn default_max_age_days() -> u64 {
    30
}

fn default_profile_ttl_hours() -> u64 {
    24
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_notes_debounce_ms() -> u64 {
    1_000
}

fn default_user_agent() -> String {
    "sideline/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            store_quota_bytes: default_store_quota_bytes(),
            working_set_size: default_working_set_size(),
            max_age_days: default_max_age_days(),
            profile_ttl_hours: default_profile_ttl_hours(),
            debounce_ms: default_debounce_ms(),
            notes_debounce_ms: default_notes_debounce_ms(),
            auto_fetch: true,
            allowlist_domains: Vec::new(),
            index_api_key: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Store quota as an Option for the store constructors (0 → unbounded).
    pub fn store_quota(&self) -> Option<u64> {
        if self.store_quota_bytes == 0 { None } else { Some(self.store_quota_bytes) }
    }

    /// Page-entry max age as a Duration.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_days * 24 * 60 * 60)
    }

    /// Profile TTL as a Duration.
    pub fn profile_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_ttl_hours * 60 * 60)
    }

    /// Automatic-fetch quiet window as a Duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Notes-source quiet window as a Duration.
    pub fn notes_debounce(&self) -> Duration {
        Duration::from_millis(self.notes_debounce_ms)
    }

    /// HTTP timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SIDELINE_`
    /// 2. TOML file from `SIDELINE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SIDELINE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SIDELINE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check that the index API key is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the index API key is not set.
    pub fn require_index_api_key(&self) -> Result<&str, ConfigError> {
        self.index_api_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "index_api_key".into(),
            hint: "Set SIDELINE_INDEX_API_KEY environment variable".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./sideline-cache.sqlite"));
        assert_eq!(config.store_quota_bytes, 5_242_880);
        assert_eq!(config.working_set_size, 20);
        assert_eq!(config.max_age_days, 30);
        assert_eq!(config.profile_ttl_hours, 24);
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.notes_debounce_ms, 1_000);
        assert!(config.auto_fetch);
        assert!(config.allowlist_domains.is_empty());
        assert!(config.index_api_key.is_none());
        assert_eq!(config.user_agent, "sideline/0.1");
    }

    #[test]
    fn test_duration_helpers() {
        let config = AppConfig::default();
        assert_eq!(config.max_age(), Duration::from_secs(30 * 24 * 60 * 60));
        assert_eq!(config.profile_ttl(), Duration::from_secs(24 * 60 * 60));
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.notes_debounce(), Duration::from_millis(1_000));
        assert_eq!(config.timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_store_quota_zero_is_unbounded() {
        let config = AppConfig { store_quota_bytes: 0, ..Default::default() };
        assert_eq!(config.store_quota(), None);

        let config = AppConfig::default();
        assert_eq!(config.store_quota(), Some(5_242_880));
    }

    #[test]
    fn test_require_index_api_key_missing() {
        let config = AppConfig::default();
        let result = config.require_index_api_key();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_index_api_key_present() {
        let config = AppConfig { index_api_key: Some("test-key".into()), ..Default::default() };
        let result = config.require_index_api_key();
        assert_eq!(result.unwrap(), "test-key");
    }
}
