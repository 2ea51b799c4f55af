//! Settings file and environment loading

use std::path::Path;

use super::{
    BackendSettings,
    ConfigError,
};

/// Settings file looked up in the configuration directory.
pub(super) const CONFIG_FILE_NAME: &str = ".i18n-http-backend.json";

/// Environment variable selecting the shared redis cache.
pub(super) const REDIS_URL_ENV: &str = "REDIS_URL";

/// Environment variable overriding the remote base URL.
pub(super) const BASE_URL_ENV: &str = "I18N_HTTP_BASE_URL";

/// Load settings from `dir`.
///
/// # Returns
/// - `Ok(Some(settings))`: settings file found and parsed
/// - `Ok(None)`: no settings file
///
/// # Errors
/// - File read error
/// - JSON parse error
pub(super) fn load_from_dir(dir: &Path) -> Result<Option<BackendSettings>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!("Configuration file not found: {:?}", config_path);
        return Ok(None);
    }

    tracing::debug!("Loading configuration from: {:?}", config_path);

    let content = std::fs::read_to_string(&config_path)?;
    let settings: BackendSettings = serde_json::from_str(&content)?;

    Ok(Some(settings))
}

/// Overlay environment variables on top of file settings.
///
/// `lookup` resolves a variable name, normally `std::env::var`. Empty values
/// are ignored.
pub(super) fn apply_env_overrides(
    mut settings: BackendSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> BackendSettings {
    let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(redis_url) = non_empty(REDIS_URL_ENV) {
        tracing::debug!("Using redis cache from {REDIS_URL_ENV}");
        settings.cache.redis_url = Some(redis_url);
    }

    if let Some(base_url) = non_empty(BASE_URL_ENV) {
        tracing::debug!(base_url = %base_url, "Using base URL from {BASE_URL_ENV}");
        settings.base_url = base_url;
    }

    settings
}
