use std::path::PathBuf;

use reqwest::Url;
use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

/// Repository the remote bundles are served from when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://github.com/dezsirazvan/translations/blob/master";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "cache.redisUrl")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSettings {
    /// Root URL serving `locales.json` and `{locale}.json`.
    pub base_url: String,

    pub key_separator: String,

    pub http: HttpSettings,
    pub cache: CacheSettings,

    /// Re-run locale discovery on this interval.
    ///
    /// - `None`: discover once at construction (default)
    /// - `Some(secs)`: refresh in a background task
    pub locale_refresh_interval_secs: Option<u64>,

    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpSettings {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub max_redirects: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { connect_timeout_ms: 2_000, read_timeout_ms: 5_000, max_redirects: 10 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    /// Shared redis cache. When unset, bundles are cached in process memory.
    pub redis_url: Option<String>,

    /// Let concurrent misses for one locale share a single remote fetch.
    pub coalesce_fetches: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { redis_url: None, coalesce_fetches: true }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, overridden by `RUST_LOG`.
    pub filter: String,

    /// Write logs to a daily rolling file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { filter: "info".to_string(), file: None }
    }
}

impl BackendSettings {
    /// # Errors
    /// - Base URL is not an absolute http(s) URL
    /// - Empty separator
    /// - Zero timeouts or refresh interval
    /// - Redis URL with an unsupported scheme
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                "baseUrl",
                format!("Unsupported scheme '{}'. Use http or https", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                "baseUrl",
                format!("Invalid URL '{}': {e}", self.base_url),
            )),
        }

        if self.key_separator.is_empty() {
            errors.push(ValidationError::new(
                "keySeparator",
                "The separator cannot be empty. Please specify a separator, for example: \".\" (dot)",
            ));
        }

        if self.http.connect_timeout_ms == 0 {
            errors.push(ValidationError::new(
                "http.connectTimeoutMs",
                "The timeout must be greater than zero",
            ));
        }

        if self.http.read_timeout_ms == 0 {
            errors.push(ValidationError::new(
                "http.readTimeoutMs",
                "The timeout must be greater than zero",
            ));
        }

        if let Some(redis_url) = &self.cache.redis_url {
            match Url::parse(redis_url) {
                Ok(url) if matches!(url.scheme(), "redis" | "rediss" | "unix") => {}
                Ok(url) => errors.push(ValidationError::new(
                    "cache.redisUrl",
                    format!("Unsupported scheme '{}'. Use redis, rediss or unix", url.scheme()),
                )),
                Err(e) => errors.push(ValidationError::new(
                    "cache.redisUrl",
                    format!("Invalid URL '{redis_url}': {e}"),
                )),
            }
        }

        if self.locale_refresh_interval_secs == Some(0) {
            errors.push(ValidationError::new(
                "localeRefreshIntervalSecs",
                "The interval must be greater than zero, or remove this field to disable refresh",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            key_separator: ".".to_string(),
            http: HttpSettings::default(),
            cache: CacheSettings::default(),
            locale_refresh_interval_secs: None,
            logging: LoggingSettings::default(),
        }
    }
}
