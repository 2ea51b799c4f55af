//! Settings management

use std::path::PathBuf;

use super::{
    BackendSettings,
    ConfigError,
    loader,
};

/// Owns the active settings and where they were loaded from.
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// Active settings
    current_settings: BackendSettings,

    /// Directory the settings file was read from
    config_dir: Option<PathBuf>,
}

impl ConfigManager {
    #[must_use]
    pub fn new() -> Self {
        Self { current_settings: BackendSettings::default(), config_dir: None }
    }

    /// Load settings from `config_dir`, then apply the process environment.
    ///
    /// # Errors
    /// - File read error
    /// - JSON parse error
    /// - Validation error
    pub fn load_settings(&mut self, config_dir: Option<PathBuf>) -> Result<(), ConfigError> {
        self.load_settings_with_env(config_dir, |name| std::env::var(name).ok())
    }

    /// Same as [`Self::load_settings`] with an explicit environment lookup.
    ///
    /// # Errors
    /// - File read error
    /// - JSON parse error
    /// - Validation error
    pub fn load_settings_with_env(
        &mut self,
        config_dir: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        tracing::debug!("Loading settings from: {:?}", config_dir);

        let settings = if let Some(dir) = &config_dir {
            loader::load_from_dir(dir)?.map_or_else(BackendSettings::default, |file| {
                tracing::debug!("Loaded file settings: {:?}", file);
                file
            })
        } else {
            BackendSettings::default()
        };
        let settings = loader::apply_env_overrides(settings, env);

        settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = settings;
        self.config_dir = config_dir;
        tracing::debug!("Settings loaded successfully: {:?}", self.current_settings);

        Ok(())
    }

    /// Replace the active settings after validating them.
    ///
    /// # Errors
    /// - Validation error
    pub fn update_settings(&mut self, new_settings: BackendSettings) -> Result<(), ConfigError> {
        tracing::debug!("Updating settings...");

        new_settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = new_settings;
        tracing::debug!("Settings updated successfully");

        Ok(())
    }

    #[must_use]
    pub const fn get_settings(&self) -> &BackendSettings {
        &self.current_settings
    }

    #[must_use]
    pub const fn config_dir(&self) -> Option<&PathBuf> {
        self.config_dir.as_ref()
    }
}
