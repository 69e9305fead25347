//! Key-value persistence
//!
//! Settings, statistics and the theme are small text blobs stored under
//! fixed keys. [`FileStore`] keeps one file per key:
//! - Settings: ~/.local/share/ultradian/store/ultradian_settings_v1
//! - Statistics: ~/.local/share/ultradian/store/ultradian_stats_v1
//! - Theme: ~/.local/share/ultradian/store/ultradian_theme_v1
//!
//! [`Storage`] wraps a backend and switches to an in-memory map for the rest
//! of the session the first time the backend fails.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Storage key of the settings blob
pub const SETTINGS_KEY: &str = "ultradian_settings_v1";
/// Storage key of the statistics blob
pub const STATS_KEY: &str = "ultradian_stats_v1";
/// Storage key of the theme text
pub const THEME_KEY: &str = "ultradian_theme_v1";

/// Store-specific errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid key name: {0}")]
    InvalidKey(String),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A text key-value backend
pub trait KeyValueStore {
    fn get_text(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_text(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// One file per key in a directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created on first write
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get_text(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| StoreError::Io { path, source })
    }

    fn set_text(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, value).map_err(|source| StoreError::Io { path, source })
    }
}

/// A store that lives only as long as the process
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get_text(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_text(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Where [`Storage`] currently keeps data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Backed by the persistent store
    Local,
    /// The backend failed; data is lost at exit
    Memory,
}

/// Fallback-aware access to a [`KeyValueStore`]
pub struct Storage<S: KeyValueStore> {
    backend: S,
    memory: HashMap<String, String>,
    mode: StorageMode,
}

impl<S: KeyValueStore> Storage<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            memory: HashMap::new(),
            mode: StorageMode::Local,
        }
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    fn degrade(&mut self, err: &StoreError) {
        if self.mode == StorageMode::Local {
            warn!(error = %err, "storage unavailable, keeping data in memory for this session");
        }
        self.mode = StorageMode::Memory;
    }

    /// Read `key`, or `fallback` when it is missing
    pub fn get_text(&mut self, key: &str, fallback: &str) -> String {
        if self.mode == StorageMode::Local {
            match self.backend.get_text(key) {
                Ok(value) => return value.unwrap_or_else(|| fallback.to_string()),
                Err(err) => self.degrade(&err),
            }
        }
        self.memory
            .get(key)
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Write `key`; returns whether the value reached the persistent store
    pub fn set_text(&mut self, key: &str, value: &str) -> bool {
        self.memory.insert(key.to_string(), value.to_string());
        if self.mode == StorageMode::Memory {
            return false;
        }
        match self.backend.set_text(key, value) {
            Ok(()) => true,
            Err(err) => {
                self.degrade(&err);
                false
            }
        }
    }

    /// Read and parse `key`, or `fallback` when it is missing or not JSON
    pub fn get_json(&mut self, key: &str, fallback: Value) -> Value {
        let present = if self.mode == StorageMode::Local {
            match self.backend.get_text(key) {
                Ok(value) => value,
                Err(err) => {
                    self.degrade(&err);
                    self.memory.get(key).cloned()
                }
            }
        } else {
            self.memory.get(key).cloned()
        };

        match present {
            Some(raw) => serde_json::from_str(&raw).unwrap_or(fallback),
            None => fallback,
        }
    }

    /// Serialize and write `key`
    pub fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(text) => self.set_text(key, &text),
            Err(err) => {
                warn!(key, error = %err, "failed to serialize value");
                false
            }
        }
    }
}
