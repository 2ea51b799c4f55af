//! Tracing subscriber setup

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Builds the filter: `RUST_LOG` when set, the configured directive otherwise.
fn env_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber for hosts that have none of their own.
///
/// With `file` set, logs go through a non-blocking daily rolling appender; keep
/// the returned guard alive to flush it on exit. Calling this twice, or after the
/// host installed a subscriber, leaves the existing one in place.
#[must_use]
pub fn init(settings: &LoggingSettings) -> Option<WorkerGuard> {
    let filter = env_filter(settings);

    let Some(path) = &settings.file else {
        if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
            tracing::debug!("Global subscriber already installed");
        }
        return None;
    };

    let directory = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    let file_name = path.file_name().map_or_else(
        || std::ffi::OsString::from("i18n-http-backend.log"),
        std::ffi::OsStr::to_os_string,
    );
    let appender = tracing_appender::rolling::daily(
        directory.unwrap_or_else(|| std::path::Path::new(".")),
        file_name,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global subscriber already installed");
    }
    Some(guard)
}
