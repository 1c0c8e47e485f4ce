//! File-based storage for native platforms: one small file per key.

use super::{KeyValueStore, StorageError, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each value as `<base>/<sanitized key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Storage in the platform's local data directory.
    ///
    /// On Unix: `~/.local/share/archsketch/preferences/`
    /// On Windows: `%LOCALAPPDATA%\archsketch\preferences\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Unavailable("Could not determine home directory".to_string()))?;
        Self::new(base.join("archsketch").join("preferences"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe))
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.key_path(key);
        fs::write(&path, value)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PersistedPreferences, Theme};
    use crate::storage::{PREFERENCES_KEY, load_preferences, save_preferences};
    use tempfile::tempdir;

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("prefs")).unwrap();

        let prefs = PersistedPreferences {
            show_minimap: true,
            theme: Theme::Light,
            ..PersistedPreferences::default()
        };
        save_preferences(&storage, &prefs).unwrap();

        let reopened = FileStorage::new(dir.path().join("prefs")).unwrap();
        assert_eq!(load_preferences(&reopened).unwrap(), Some(prefs));
    }

    #[test]
    fn test_missing_key() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        assert!(storage.get(PREFERENCES_KEY).unwrap().is_none());
        storage.remove(PREFERENCES_KEY).unwrap();
    }

    #[test]
    fn test_key_sanitized() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        storage.set("a/b:c", "x").unwrap();
        assert!(dir.path().join("a_b_c.json").exists());
        assert_eq!(storage.get("a/b:c").unwrap().as_deref(), Some("x"));
    }
}
