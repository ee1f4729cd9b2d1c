//! Local key-value persistence: browser `localStorage` on wasm, a SQLite
//! table on native, and an in-memory map for tests and fallbacks.

use crate::api::models::Production;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

#[cfg(target_arch = "wasm32")]
use gloo_storage::{errors::StorageError, LocalStorage, Storage};

const SETTINGS_KEY: &str = "cuedesk.settings";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KvError {
    #[error("local storage is unavailable: {0}")]
    Unavailable(String),
    #[error("failed to write {key}: {reason}")]
    Write { key: String, reason: String },
}

/// Synchronous string key-value store scoped to the local profile.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    fn set(&self, key: &str, value: &str) -> Result<(), KvError>;
    fn remove(&self, key: &str) -> Result<(), KvError>;
}

/// Reads and decodes a JSON value. Missing, unreadable and malformed entries
/// all read as `None`.
pub fn load_json<T: DeserializeOwned>(kv: &dyn KeyValueStore, key: &str) -> Option<T> {
    match kv.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, %err, "ignoring malformed stored value");
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            tracing::warn!(key, %err, "local storage read failed");
            None
        }
    }
}

pub fn save_json<T: Serialize>(
    kv: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), KvError> {
    let raw = serde_json::to_string(value).map_err(|e| KvError::Write {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    kv.set(key, &raw)
}

/// How comments are added to a cue document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CommentWriteMode {
    /// Server-side array union; concurrent commenters never lose a comment.
    #[default]
    AtomicAppend,
    /// Read the cue, push locally, overwrite the array. Last writer wins.
    ReadModifyWrite,
}

/// Dashboard preferences stored locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DashboardSettings {
    #[serde(default)]
    pub comment_write_mode: CommentWriteMode,
    #[serde(default)]
    pub last_filter: Option<Production>,
}

pub fn load_settings(kv: &dyn KeyValueStore) -> DashboardSettings {
    load_json(kv, SETTINGS_KEY).unwrap_or_default()
}

pub fn save_settings(kv: &dyn KeyValueStore, settings: &DashboardSettings) -> Result<(), KvError> {
    save_json(kv, SETTINGS_KEY, settings)
}

/// Non-persistent store. `fail_writes` simulates a full or blocked storage.
#[derive(Default)]
pub struct MemoryKv {
    entries: RefCell<HashMap<String, String>>,
    fail_writes: Cell<bool>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        if self.fail_writes.get() {
            return Err(KvError::Write {
                key: key.to_string(),
                reason: "quota exceeded".to_string(),
            });
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), KvError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// `window.localStorage` through gloo.
#[cfg(target_arch = "wasm32")]
pub struct BrowserKv;

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for BrowserKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        match LocalStorage::get::<String>(key) {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::KeyNotFound(_)) => Ok(None),
            // Values written outside this app are not JSON strings; treat as absent.
            Err(StorageError::SerdeError(_)) => Ok(None),
            Err(err) => Err(KvError::Unavailable(err.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        LocalStorage::set(key, value).map_err(|e| KvError::Write {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    fn remove(&self, key: &str) -> Result<(), KvError> {
        LocalStorage::delete(key);
        Ok(())
    }
}

/// `kv` table in the application's SQLite database.
#[cfg(not(target_arch = "wasm32"))]
pub struct SqliteKv {
    conn: RefCell<rusqlite::Connection>,
}

#[cfg(not(target_arch = "wasm32"))]
impl SqliteKv {
    pub fn open(path: &std::path::Path) -> Result<Self, KvError> {
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| KvError::Unavailable(format!("failed to open database: {}", e)))?;
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, KvError> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| KvError::Unavailable(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Opens `cuedesk.db` in the platform data directory.
    pub fn open_default() -> Result<Self, KvError> {
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join("cuedesk"))
            .unwrap_or_else(|| std::path::PathBuf::from(".cuedesk"));
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| KvError::Unavailable(format!("{}: {}", data_dir.display(), e)))?;
        Self::open(&data_dir.join("cuedesk.db"))
    }

    fn with_connection(conn: rusqlite::Connection) -> Result<Self, KvError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| KvError::Unavailable(e.to_string()))?;
        Ok(Self {
            conn: RefCell::new(conn),
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        use rusqlite::OptionalExtension;

        self.conn
            .borrow()
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(|e| KvError::Unavailable(e.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.conn
            .borrow()
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                [key, value],
            )
            .map(|_| ())
            .map_err(|e| KvError::Write {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn remove(&self, key: &str) -> Result<(), KvError> {
        self.conn
            .borrow()
            .execute("DELETE FROM kv WHERE key = ?1", [key])
            .map(|_| ())
            .map_err(|e| KvError::Write {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

/// The profile-scoped store for the current platform.
#[cfg(target_arch = "wasm32")]
pub fn platform_store() -> Rc<dyn KeyValueStore> {
    Rc::new(BrowserKv)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn platform_store() -> Rc<dyn KeyValueStore> {
    match SqliteKv::open_default() {
        Ok(store) => Rc::new(store),
        Err(err) => {
            tracing::warn!(%err, "falling back to non-persistent storage");
            Rc::new(MemoryKv::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_store_overwrites_and_removes() {
        let kv = SqliteKv::open_in_memory().unwrap();
        assert_eq!(kv.get("a").unwrap(), None);
        kv.set("a", "1").unwrap();
        kv.set("a", "2").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("2"));
        kv.remove("a").unwrap();
        assert_eq!(kv.get("a").unwrap(), None);
    }

    #[test]
    fn malformed_settings_fall_back_to_defaults() {
        let kv = MemoryKv::new();
        kv.set(SETTINGS_KEY, "{not json").unwrap();
        assert_eq!(load_settings(&kv), DashboardSettings::default());
    }

    #[test]
    fn settings_persist_and_tolerate_missing_fields() {
        let kv = MemoryKv::new();
        let settings = DashboardSettings {
            comment_write_mode: CommentWriteMode::ReadModifyWrite,
            last_filter: Some(Production::AntonyAndCleopatra),
        };
        save_settings(&kv, &settings).unwrap();
        assert_eq!(load_settings(&kv), settings);

        kv.set(SETTINGS_KEY, "{}").unwrap();
        assert_eq!(
            load_settings(&kv).comment_write_mode,
            CommentWriteMode::AtomicAppend
        );
    }

    #[test]
    fn memory_store_can_simulate_full_storage() {
        let kv = MemoryKv::new();
        kv.set_fail_writes(true);
        assert!(matches!(kv.set("k", "v"), Err(KvError::Write { .. })));
        assert_eq!(kv.len(), 0);
    }
}
