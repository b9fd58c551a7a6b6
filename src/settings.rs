//! Small key/value persistence for UI settings such as the edit mode.

use std::collections::BTreeMap;

use crate::config::ConfigError;
use crate::constants::EDIT_MODE_STORAGE_KEY;
use crate::model::EditMode;

/// String values by key.
pub trait SettingsStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError>;
}

/// Volatile storage, for tests and hosts without persistence.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Restore the persisted edit mode. Missing or unknown values give the default.
pub fn load_edit_mode<S: SettingsStorage + ?Sized>(storage: &S) -> EditMode {
    match storage.get(EDIT_MODE_STORAGE_KEY) {
        Ok(Some(value)) => EditMode::parse(&value).unwrap_or_else(|| {
            log::debug!("Unknown stored edit mode {:?}, using default", value);
            EditMode::default()
        }),
        Ok(None) => EditMode::default(),
        Err(e) => {
            log::warn!("Failed to read stored edit mode: {}", e);
            EditMode::default()
        }
    }
}

/// Persist the edit mode.
pub fn save_edit_mode<S: SettingsStorage + ?Sized>(
    storage: &mut S,
    mode: EditMode,
) -> Result<(), ConfigError> {
    storage.set(EDIT_MODE_STORAGE_KEY, mode.as_str())
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};

    use super::SettingsStorage;
    use crate::config::ConfigError;

    /// JSON object of strings in a single file.
    #[derive(Debug, Clone)]
    pub struct FileStorage {
        path: PathBuf,
    }

    impl FileStorage {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        /// `<data_dir>/fovcanvas/settings.json`
        pub fn default_path() -> Option<PathBuf> {
            dirs::data_dir().map(|dir| dir.join("fovcanvas").join("settings.json"))
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn read_all(&self) -> Result<BTreeMap<String, String>, ConfigError> {
            if !self.path.exists() {
                return Ok(BTreeMap::new());
            }
            let json = std::fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&json)?)
        }
    }

    impl SettingsStorage for FileStorage {
        fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
            Ok(self.read_all()?.remove(key))
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
            let mut values = self.read_all()?;
            values.insert(key.to_string(), value.to_string());
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.path, serde_json::to_string_pretty(&values)?)?;
            log::debug!("Stored setting {} in {:?}", key, self.path);
            Ok(())
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::LocalStorage;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::SettingsStorage;
    use crate::config::ConfigError;

    /// Browser `localStorage`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct LocalStorage;

    impl LocalStorage {
        fn storage() -> Result<web_sys::Storage, ConfigError> {
            let window = web_sys::window()
                .ok_or_else(|| ConfigError::StorageError("No window object available".to_string()))?;
            window
                .local_storage()
                .map_err(|e| ConfigError::StorageError(format!("localStorage access error: {:?}", e)))?
                .ok_or_else(|| ConfigError::StorageError("localStorage not available".to_string()))
        }
    }

    impl SettingsStorage for LocalStorage {
        fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
            Self::storage()?
                .get_item(key)
                .map_err(|e| ConfigError::StorageError(format!("Failed to read {}: {:?}", key, e)))
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
            Self::storage()?
                .set_item(key, value)
                .map_err(|e| ConfigError::StorageError(format!("Failed to write {}: {:?}", key, e)))
        }
    }
}
