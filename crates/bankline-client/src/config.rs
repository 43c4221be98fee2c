//! Pipeline configuration.
//!
//! Loaded from `config.toml` in the bankline config directory. Every field
//! has a default, so a missing file or a partial file is fine:
//!
//! ```toml
//! base_url = "https://bank.example.com"
//! base_timeout_ms = 30000
//!
//! [[timeout_overrides]]
//! pattern = "/api/v1/reports"
//! timeout_ms = 120000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use bankline_auth::{DEFAULT_LANDING_ROUTE, DEFAULT_SIGN_IN_ROUTE};

/// Application name used for the config directory.
const APP_NAME: &str = "bankline";

/// Config file name within the config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the config directory.
const CONFIG_DIR_ENV: &str = "BANKLINE_CONFIG_DIR";

/// Default base timeout for requests.
pub const DEFAULT_BASE_TIMEOUT_MS: u64 = 30_000;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Status codes retried by default (plus status 0).
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A timeout override for URLs containing `pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutOverride {
    pub pattern: String,
    pub timeout_ms: u64,
}

/// Request pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Backend base URL; relative request paths are joined onto it.
    pub base_url: String,
    /// Timeout for non-mutating requests. POST/PUT get twice this.
    pub base_timeout_ms: u64,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each later one.
    pub backoff_base_ms: u64,
    /// Statuses eligible for retry. Status 0 is always eligible.
    pub retryable_statuses: Vec<u16>,
    /// Public landing route.
    pub landing_route: String,
    /// Sign-in route.
    pub sign_in_route: String,
    /// URL-pattern timeouts, checked in order.
    pub timeout_overrides: Vec<TimeoutOverride>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            base_timeout_ms: DEFAULT_BASE_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
            timeout_overrides: Vec::new(),
            landing_route: DEFAULT_LANDING_ROUTE.to_string(),
            sign_in_route: DEFAULT_SIGN_IN_ROUTE.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_timeout_ms == 0 {
            return Err(ConfigError::Invalid("base_timeout_ms must be positive".to_string()));
        }
        if let Some(o) = self
            .timeout_overrides
            .iter()
            .find(|o| o.pattern.is_empty() || o.timeout_ms == 0)
        {
            return Err(ConfigError::Invalid(format!(
                "timeout override '{}' needs a pattern and a positive timeout",
                o.pattern
            )));
        }
        Ok(())
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_base_timeout(mut self, timeout: Duration) -> Self {
        self.base_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_timeout_override(mut self, pattern: impl Into<String>, timeout: Duration) -> Self {
        self.timeout_overrides.push(TimeoutOverride {
            pattern: pattern.into(),
            timeout_ms: timeout.as_millis() as u64,
        });
        self
    }

    pub fn base_timeout(&self) -> Duration {
        Duration::from_millis(self.base_timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

/// Get the config directory for bankline.
///
/// Checks `BANKLINE_CONFIG_DIR` first, then falls back to the platform
/// default (`~/.config/bankline` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Path of the config file, if a config directory can be determined.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(CONFIG_FILE))
}

/// Load configuration from the default location.
pub fn load_config() -> Result<PipelineConfig, ConfigError> {
    load_config_from(config_path().as_deref())
}

/// Load configuration from a specific path. A missing file yields defaults.
pub fn load_config_from(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };

    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(PipelineConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    PipelineConfig::from_toml(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.base_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_base(), Duration::from_secs(1));
        assert_eq!(config.retryable_statuses, vec![408, 429, 500, 502, 503, 504]);
        assert_eq!(config.landing_route, "/welcome");
        assert_eq!(config.sign_in_route, "/sign-in");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
base_url = "https://bank.example.com"

[[timeout_overrides]]
pattern = "/reports"
timeout_ms = 120000
"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://bank.example.com");
        assert_eq!(config.base_timeout_ms, DEFAULT_BASE_TIMEOUT_MS);
        assert_eq!(config.timeout_overrides.len(), 1);
        assert_eq!(config.timeout_overrides[0].timeout_ms, 120_000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = PipelineConfig::from_toml("base_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = PipelineConfig::from_toml(
            r#"
[[timeout_overrides]]
pattern = ""
timeout_ms = 10
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_parse_error() {
        let err = PipelineConfig::from_toml("base_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "max_retries = 5\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(load_config_from(None).unwrap(), PipelineConfig::default());
    }
}
