//! Engine settings.
//!
//! Persisted as JSON; every field has a default so partial files load.

use galleria_fetch::{DEFAULT_API_RETRIES, DEFAULT_TIMEOUT, ExtractionSettings};
use galleria_strategies::api::DEFAULT_ENDPOINT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::cache::CacheConfig;
use crate::error::StoreError;
use crate::persistence::{load_json_or_default, save_json};

// ============================================================================
// Settings Types
// ============================================================================

/// All tunables of the extraction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Result cache sizing.
    pub cache: CacheSettings,

    /// Platform API access.
    pub api: ApiSettings,

    /// Chain behaviour.
    pub extraction: ExtractionConfig,

    /// Extractions between metrics reports; 0 disables reports.
    pub metrics_report_interval: u32,

    /// Log level.
    pub log_level: LogLevel,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            api: ApiSettings::default(),
            extraction: ExtractionConfig::default(),
            metrics_report_interval: 25,
            log_level: LogLevel::default(),
        }
    }
}

/// Result cache sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of cached results.
    pub max_entries: usize,
    /// Time-to-live in milliseconds.
    pub ttl_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 50,
            ttl_ms: 300_000,
        }
    }
}

impl CacheSettings {
    /// Converts to a cache config.
    pub fn to_config(&self) -> CacheConfig {
        CacheConfig::new(self.max_entries, Duration::from_millis(self.ttl_ms))
    }
}

/// Platform API access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Whether the API strategy is part of the chain.
    pub enabled: bool,
    /// Media endpoint.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Hosts the client may talk to; empty allows any.
    pub allowed_domains: Vec<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 15,
            allowed_domains: Vec::new(),
        }
    }
}

/// Chain behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Bound on one extraction in milliseconds.
    pub timeout_ms: u64,
    /// Retries granted to the API strategy.
    pub api_retries: u32,
    /// Delay between API retries in milliseconds.
    pub backoff_ms: u64,
    /// Skip strategies registered twice under one name.
    pub duplicate_guard: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: u64::try_from(DEFAULT_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            api_retries: DEFAULT_API_RETRIES,
            backoff_ms: 0,
            duplicate_guard: true,
        }
    }
}

impl ExtractionConfig {
    /// Converts to chain settings.
    pub fn to_settings(&self) -> ExtractionSettings {
        let settings = ExtractionSettings::default()
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_api_retries(self.api_retries)
            .with_retry_backoff(Duration::from_millis(self.backoff_ms));
        if self.duplicate_guard {
            settings
        } else {
            settings.without_duplicate_guard()
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    #[default]
    Warn,
    /// Info level logging.
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

// ============================================================================
// Validation & Persistence
// ============================================================================

impl EngineSettings {
    /// Checks the settings for values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.cache.max_entries == 0 {
            return Err(StoreError::Config("cache.max_entries must be at least 1".to_string()));
        }
        if self.cache.ttl_ms == 0 {
            return Err(StoreError::Config("cache.ttl_ms must be positive".to_string()));
        }
        if self.extraction.timeout_ms == 0 {
            return Err(StoreError::Config("extraction.timeout_ms must be positive".to_string()));
        }
        if self.api.enabled {
            let endpoint = Url::parse(&self.api.endpoint)
                .map_err(|e| StoreError::Config(format!("api.endpoint is not a URL: {e}")))?;
            if !matches!(endpoint.scheme(), "http" | "https") {
                return Err(StoreError::Config("api.endpoint must be http(s)".to_string()));
            }
        }
        Ok(())
    }

    /// Loads settings from `path`, falling back to defaults.
    pub async fn load(path: &Path) -> Self {
        if path.exists() {
            info!(path = %path.display(), "Loading settings");
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
        }
        load_json_or_default(path).await
    }

    /// Saves settings to `path` after validating them.
    ///
    /// # Errors
    ///
    /// Returns error if the settings are invalid or cannot be written.
    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        self.validate()?;
        save_json(path, self).await?;
        info!(path = %path.display(), "Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = EngineSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.cache.to_config().max_entries, 50);
        assert_eq!(settings.cache.to_config().ttl, Duration::from_secs(300));
        assert_eq!(settings.extraction.to_settings().timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_validate_rejects_zero_cache() {
        let mut settings = EngineSettings::default();
        settings.cache.max_entries = 0;
        assert!(matches!(settings.validate(), Err(StoreError::Config(_))));

        let mut settings = EngineSettings::default();
        settings.cache.ttl_ms = 0;
        assert!(matches!(settings.validate(), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_bad_endpoint_only_matters_when_enabled() {
        let mut settings = EngineSettings::default();
        settings.api.endpoint = "ftp://nope".to_string();
        assert!(settings.validate().is_err());
        settings.api.enabled = false;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{"cache": {"ttl_ms": 1000}, "log_level": "debug"}"#).unwrap();
        assert_eq!(settings.cache.ttl_ms, 1000);
        assert_eq!(settings.cache.max_entries, 50);
        assert_eq!(settings.log_level, LogLevel::Debug);
        assert_eq!(settings.metrics_report_interval, 25);
    }

    #[test]
    fn test_duplicate_guard_flag() {
        let config = ExtractionConfig {
            duplicate_guard: false,
            ..ExtractionConfig::default()
        };
        assert!(!config.to_settings().duplicate_guard);
    }
}
