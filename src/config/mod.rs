//! Backend configuration
/// Settings file and environment loading
mod loader;
/// Configuration manager
mod manager;
/// Configuration types and settings
mod types;

pub use manager::ConfigManager;
pub use types::{
    BackendSettings,
    CacheSettings,
    ConfigError,
    DEFAULT_BASE_URL,
    HttpSettings,
    LoggingSettings,
    ValidationError,
};
