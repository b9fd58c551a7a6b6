//! Logger installation for native and browser builds.

use crate::config::LogLevel;

/// Install the platform logger at `level`. A second call leaves the first
/// logger in place.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging(level: LogLevel) {
    let result = env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
    match result {
        Ok(()) => log::info!("Logging initialized at {}", level.name()),
        Err(e) => log::debug!("Logger already installed: {}", e),
    }
}

/// Install the platform logger at `level`. A second call leaves the first
/// logger in place.
#[cfg(target_arch = "wasm32")]
pub fn init_logging(level: LogLevel) {
    let level = match level {
        LogLevel::Error => log::Level::Error,
        LogLevel::Warn => log::Level::Warn,
        LogLevel::Info => log::Level::Info,
        LogLevel::Debug => log::Level::Debug,
        LogLevel::Trace => log::Level::Trace,
    };
    match console_log::init_with_level(level) {
        Ok(()) => log::info!("Logging initialized at {}", level),
        Err(e) => log::debug!("Logger already installed: {}", e),
    }
}
