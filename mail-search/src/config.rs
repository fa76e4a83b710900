//! Configuration for mail-search

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SearchError};
use crate::query::PaginationDefaults;

/// Overrides `api.base_url`
pub const ENV_API_URL: &str = "MAIL_SEARCH_API_URL";
/// Overrides `logging.level`
pub const ENV_LOG_LEVEL: &str = "MAIL_SEARCH_LOG_LEVEL";

/// Main client configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Search API location
    #[serde(default)]
    pub api: ApiConfig,
    /// Pagination defaults
    #[serde(default)]
    pub pagination: PaginationDefaults,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the API (e.g., "http://localhost:8080")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the search endpoint, joined onto `base_url`
    #[serde(default = "default_search_path")]
    pub search_path: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_search_path() -> String {
    "/api/mails/search".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_path: default_search_path(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SearchError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SearchError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from `path` when given, then apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `MAIL_SEARCH_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            if !level.trim().is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.base_url).map_err(|e| {
            SearchError::Config(format!("Invalid base URL '{}': {}", self.api.base_url, e))
        })?;

        if !self.api.search_path.starts_with('/') {
            return Err(SearchError::Config(format!(
                "Search path must start with '/': {}",
                self.api.search_path
            )));
        }

        let pagination = &self.pagination;
        if pagination.default_page < 1 || pagination.default_limit < 1 {
            return Err(SearchError::Config(
                "Pagination defaults must be at least 1".to_string(),
            ));
        }
        if pagination.max_limit < pagination.default_limit {
            return Err(SearchError::Config(format!(
                "max_limit ({}) is below default_limit ({})",
                pagination.max_limit, pagination.default_limit
            )));
        }

        Ok(())
    }

    /// Full URL of the search endpoint
    pub fn search_url(&self) -> Result<String> {
        let base = url::Url::parse(&self.api.base_url).map_err(|e| {
            SearchError::Config(format!("Invalid base URL '{}': {}", self.api.base_url, e))
        })?;
        let url = base
            .join(&self.api.search_path)
            .map_err(|e| SearchError::Config(format!("Invalid search path: {}", e)))?;
        Ok(url.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }
}
