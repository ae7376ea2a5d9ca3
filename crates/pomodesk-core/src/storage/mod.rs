mod config;
mod memory;
pub mod sqlite;

pub use config::{AppConfig, TimingMode};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// String key-value store holding the persisted JSON records.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Returns the data directory, creating it if needed.
///
/// `POMODESK_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/pomodesk[-dev]/`, with the `-dev` suffix when
/// `POMODESK_ENV=dev`.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("POMODESK_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("POMODESK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pomodesk-dev")
            } else {
                base_dir.join("pomodesk")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Deserialize `raw` onto `T::default()` one top-level field at a time.
///
/// Fields that are unknown, or whose value does not fit the field's type,
/// keep their default. Input that is not a JSON object yields the default.
pub fn merge_with_defaults<T>(raw: &str) -> T
where
    T: Default + Serialize + DeserializeOwned,
{
    let defaults = T::default();
    let Ok(serde_json::Value::Object(mut merged)) = serde_json::to_value(&defaults) else {
        return defaults;
    };
    let Ok(serde_json::Value::Object(stored)) = serde_json::from_str::<serde_json::Value>(raw)
    else {
        return defaults;
    };

    for (key, value) in stored {
        let Some(previous) = merged.get(&key).cloned() else {
            continue;
        };
        merged.insert(key.clone(), value);
        if serde_json::from_value::<T>(serde_json::Value::Object(merged.clone())).is_err() {
            merged.insert(key, previous);
        }
    }

    serde_json::from_value(serde_json::Value::Object(merged)).unwrap_or(defaults)
}
