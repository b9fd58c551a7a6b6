//! Configuration file support.
//!
//! The engine configuration is a versioned JSON document. Every field has a
//! default, so partial files load fine and new fields can be added without
//! bumping the version.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_PRELOAD_BUFFER_SIZE, HANDLE_HIT_RADIUS, HANDLE_RADIUS, MAX_UNDO_STACK_SIZE,
    MIN_BOX_SIZE, zoom,
};
use crate::interaction::InteractionSettings;
use crate::preload::{ImageEndpoint, ImageKind};
use crate::viewport::ZoomLimits;

/// Log level setting for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Get all log levels in order from least to most verbose.
    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ]
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub preferences: Preferences,

    #[serde(default)]
    pub interaction: InteractionConfig,

    #[serde(default)]
    pub endpoint: EndpointConfig,
}

/// General preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Number of images to preload before/after current
    #[serde(default = "default_preload_buffer_size")]
    pub preload_buffer_size: usize,

    /// Variant requested for preloaded images
    #[serde(default)]
    pub preload_kind: ImageKind,

    #[serde(default = "default_max_undo_stack_size")]
    pub max_undo_stack_size: usize,
}

fn default_preload_buffer_size() -> usize {
    DEFAULT_PRELOAD_BUFFER_SIZE
}

fn default_max_undo_stack_size() -> usize {
    MAX_UNDO_STACK_SIZE
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            preload_buffer_size: default_preload_buffer_size(),
            preload_kind: ImageKind::default(),
            max_undo_stack_size: default_max_undo_stack_size(),
        }
    }
}

/// Gesture tunables. Sizes of handles are screen pixels, box sizes image pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    #[serde(default = "default_min_box_size")]
    pub min_box_size: f32,
    #[serde(default = "default_handle_radius")]
    pub handle_radius: f32,
    #[serde(default = "default_handle_hit_radius")]
    pub handle_hit_radius: f32,
    #[serde(default = "default_zoom_min")]
    pub zoom_min: f32,
    #[serde(default = "default_zoom_max")]
    pub zoom_max: f32,
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,
}

fn default_min_box_size() -> f32 {
    MIN_BOX_SIZE
}

fn default_handle_radius() -> f32 {
    HANDLE_RADIUS
}

fn default_handle_hit_radius() -> f32 {
    HANDLE_HIT_RADIUS
}

fn default_zoom_min() -> f32 {
    zoom::MIN
}

fn default_zoom_max() -> f32 {
    zoom::MAX
}

fn default_zoom_step() -> f32 {
    zoom::STEP
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            min_box_size: default_min_box_size(),
            handle_radius: default_handle_radius(),
            handle_hit_radius: default_handle_hit_radius(),
            zoom_min: default_zoom_min(),
            zoom_max: default_zoom_max(),
            zoom_step: default_zoom_step(),
        }
    }
}

impl InteractionConfig {
    /// Settings for the box editor. Swapped or non-positive zoom bounds fall
    /// back to the defaults.
    pub fn to_settings(&self) -> InteractionSettings {
        let zoom = if self.zoom_min > 0.0 && self.zoom_min <= self.zoom_max && self.zoom_step > 1.0
        {
            ZoomLimits {
                min: self.zoom_min,
                max: self.zoom_max,
                step: self.zoom_step,
            }
        } else {
            log::warn!(
                "Invalid zoom limits {}..{} step {}, using defaults",
                self.zoom_min,
                self.zoom_max,
                self.zoom_step
            );
            ZoomLimits::default()
        };
        InteractionSettings {
            min_box_size: self.min_box_size.max(0.0),
            handle_radius: self.handle_radius.max(0.0),
            handle_hit_radius: self.handle_hit_radius.max(0.0),
            zoom,
        }
    }
}

/// Image backend location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub access_token: String,
}

impl EndpointConfig {
    /// URL builder, or `None` when no backend is configured.
    pub fn to_endpoint(&self) -> Option<ImageEndpoint> {
        if self.base_url.is_empty() {
            return None;
        }
        Some(ImageEndpoint::new(&self.base_url, &self.access_token))
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: Preferences::default(),
            interaction: InteractionConfig::default(),
            endpoint: EndpointConfig::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "fovcanvas-config.json"
    }

    /// Get the default config file path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("fovcanvas").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("fovcanvas")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load_from_path(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to a file, creating parent directories.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Save configuration to the default path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save_to_path(&path)
    }

    /// LocalStorage key for WASM config persistence.
    #[cfg(target_arch = "wasm32")]
    const LOCALSTORAGE_KEY: &'static str = "fovcanvas-config";

    /// Try to load configuration from localStorage (WASM only).
    /// Returns None if not found or can't be parsed.
    #[cfg(target_arch = "wasm32")]
    pub fn load_from_local_storage() -> Option<Self> {
        let window = web_sys::window()?;
        let storage = window.local_storage().ok()??;

        match storage.get_item(Self::LOCALSTORAGE_KEY) {
            Ok(Some(json)) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from localStorage");
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config from localStorage: {}", e);
                    None
                }
            },
            Ok(None) => {
                log::debug!("No config found in localStorage");
                None
            }
            Err(e) => {
                log::warn!("Failed to read from localStorage: {:?}", e);
                None
            }
        }
    }

    /// Save configuration to localStorage (WASM only).
    #[cfg(target_arch = "wasm32")]
    pub fn save_to_local_storage(&self) -> Result<(), ConfigError> {
        let window = web_sys::window()
            .ok_or_else(|| ConfigError::StorageError("No window object available".to_string()))?;

        let storage = window
            .local_storage()
            .map_err(|e| ConfigError::StorageError(format!("localStorage access error: {:?}", e)))?
            .ok_or_else(|| ConfigError::StorageError("localStorage not available".to_string()))?;

        let json = self.to_json()?;

        storage
            .set_item(Self::LOCALSTORAGE_KEY, &json)
            .map_err(|e| {
                ConfigError::StorageError(format!("Failed to save to localStorage: {:?}", e))
            })?;

        log::info!("Saved configuration to localStorage");
        Ok(())
    }

    /// Load from the platform's default location, falling back to defaults.
    pub fn load_or_default() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let loaded = Self::load_from_default_path();
        #[cfg(target_arch = "wasm32")]
        let loaded = Self::load_from_local_storage();
        loaded.unwrap_or_default()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading or saving configuration and settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Storage error (localStorage in WASM)
    #[error("Storage error: {0}")]
    StorageError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let mut config = EngineConfig::new();
        config.preferences.preload_buffer_size = 4;
        config.preferences.preload_kind = ImageKind::Thumbnail;
        config.endpoint.base_url = "https://lab.example/api".to_string();

        let json = config.to_json().unwrap();
        assert!(json.contains("\"thumbnail\""));
        let restored = EngineConfig::from_json(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_version_too_new() {
        let json = format!(r#"{{"version": {}}}"#, CONFIG_VERSION + 1);
        let result = EngineConfig::from_json(&json);
        assert!(matches!(
            result,
            Err(ConfigError::VersionTooNew {
                supported_version: CONFIG_VERSION,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let json = r#"{"version": 1, "preferences": {"log_level": "debug"}, "interaction": {"zoom_max": 8.0}}"#;
        let config = EngineConfig::from_json(json).unwrap();
        assert_eq!(config.preferences.log_level, LogLevel::Debug);
        assert_eq!(config.preferences.preload_buffer_size, DEFAULT_PRELOAD_BUFFER_SIZE);
        assert_eq!(config.preferences.max_undo_stack_size, MAX_UNDO_STACK_SIZE);
        assert_eq!(config.interaction.zoom_max, 8.0);
        assert_eq!(config.interaction.min_box_size, MIN_BOX_SIZE);
        assert!(config.endpoint.to_endpoint().is_none());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EngineConfig::from_json("{ not json"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_interaction_settings() {
        let mut interaction = InteractionConfig {
            zoom_max: 8.0,
            ..InteractionConfig::default()
        };
        assert_eq!(interaction.to_settings().zoom.max, 8.0);

        interaction.zoom_min = 10.0;
        assert_eq!(interaction.to_settings().zoom, ZoomLimits::default());
    }

    #[test]
    fn test_endpoint() {
        let endpoint = EndpointConfig {
            base_url: "https://lab.example".to_string(),
            access_token: "t".to_string(),
        };
        assert_eq!(
            endpoint.to_endpoint().unwrap().url(7, ImageKind::Original),
            "https://lab.example/images/7/original?token=t"
        );
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::all().len(), 5);
        assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::default().name(), "Info");
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_save_and_load_path() {
        let dir = std::env::temp_dir().join(format!("fovcanvas-config-{}", std::process::id()));
        let path = dir.join("nested").join(EngineConfig::default_filename());
        let mut config = EngineConfig::new();
        config.preferences.log_level = LogLevel::Trace;
        config.save_to_path(&path).unwrap();

        assert_eq!(EngineConfig::load_from_path(&path).unwrap(), config);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
