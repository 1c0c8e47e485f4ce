//! Key-value blob storage for the few preferences that survive a reload.
//!
//! Canvas content is never written here; saving diagrams belongs to the
//! host's export collaborator.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

#[cfg(target_arch = "wasm32")]
mod local;

pub use memory::MemoryStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(target_arch = "wasm32")]
pub use local::LocalStorage;

use crate::model::PersistedPreferences;
use thiserror::Error;

/// Key under which view preferences are stored.
pub const PREFERENCES_KEY: &str = "archsketch.view-preferences";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A small string-keyed blob store (browser local storage, a file per key).
pub trait KeyValueStore {
    /// Read a value; `Ok(None)` if absent.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Write the whitelisted preferences.
pub fn save_preferences(store: &dyn KeyValueStore, prefs: &PersistedPreferences) -> StorageResult<()> {
    let json = serde_json::to_string(prefs).map_err(|e| StorageError::Serialization(e.to_string()))?;
    store.set(PREFERENCES_KEY, &json)
}

/// Read the whitelisted preferences; `Ok(None)` if nothing was saved yet.
///
/// Unknown fields are ignored and missing ones take their defaults, so
/// blobs written by older or newer builds still load.
pub fn load_preferences(store: &dyn KeyValueStore) -> StorageResult<Option<PersistedPreferences>> {
    let Some(json) = store.get(PREFERENCES_KEY)? else {
        return Ok(None);
    };
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| StorageError::Serialization(e.to_string()))
}
