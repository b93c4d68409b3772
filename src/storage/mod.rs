//! # Storage Module
//!
//! Namespaced non-volatile key-value storage.
//!
//! Each namespace is one JSON object file (`<dir>/<namespace>.json`).
//! Writes go to a temporary file first and are renamed into place, so a
//! power cut never leaves a half-written namespace behind.

pub mod token;

pub use token::PersistedToken;

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, TrackerError};

/// Namespaced string key-value store
pub trait KeyValueStore: Send {
    /// Read `key` from `namespace`, `None` if it was never written
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>>;

    /// Write `key` in `namespace`
    fn put(&mut self, namespace: &str, key: &str, value: &str) -> Result<()>;
}

/// JSON-file backed store rooted at a directory
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    read_only: bool,
}

impl FileStore {
    /// Open a store rooted at `dir`
    ///
    /// A read-write store creates the directory if needed; a read-only
    /// store rejects every `put`.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn open(dir: impl Into<PathBuf>, read_only: bool) -> Result<Self> {
        let dir = dir.into();
        if !read_only {
            fs::create_dir_all(&dir).map_err(|e| {
                TrackerError::Storage(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(Self { dir, read_only })
    }

    /// Root directory of the store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn namespace_path(&self, namespace: &str) -> Result<PathBuf> {
        let valid = !namespace.is_empty()
            && namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(TrackerError::Storage(format!(
                "Invalid namespace name: {:?}",
                namespace
            )));
        }
        Ok(self.dir.join(format!("{}.json", namespace)))
    }

    fn read_namespace(&self, path: &Path) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                TrackerError::Parse(format!("Corrupt store file {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(TrackerError::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let path = self.namespace_path(namespace)?;
        Ok(self.read_namespace(&path)?.remove(key))
    }

    fn put(&mut self, namespace: &str, key: &str, value: &str) -> Result<()> {
        if self.read_only {
            return Err(TrackerError::Storage(format!(
                "Store at {} is read-only",
                self.dir.display()
            )));
        }

        let path = self.namespace_path(namespace)?;
        let mut entries = self.read_namespace(&path)?;
        entries.insert(key.to_string(), value.to_string());

        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(&entries)?;
        fs::write(&tmp, contents).map_err(|e| {
            TrackerError::Storage(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            TrackerError::Storage(format!("Failed to replace {}: {}", path.display(), e))
        })?;

        debug!("Stored {}/{}", namespace, key);
        Ok(())
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// In-memory store with shared state and a write counter
    #[derive(Clone, Default)]
    pub struct MemoryStore {
        pub entries: Arc<Mutex<BTreeMap<(String, String), String>>>,
        pub writes: Arc<Mutex<usize>>,
        pub fail_writes: Arc<Mutex<bool>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(namespace: &str, key: &str, value: &str) -> Self {
            let store = Self::new();
            store
                .entries
                .lock()
                .unwrap()
                .insert((namespace.to_string(), key.to_string()), value.to_string());
            store
        }

        pub fn value(&self, namespace: &str, key: &str) -> Option<String> {
            self.entries
                .lock()
                .unwrap()
                .get(&(namespace.to_string(), key.to_string()))
                .cloned()
        }

        pub fn write_count(&self) -> usize {
            *self.writes.lock().unwrap()
        }

        pub fn set_fail_writes(&self, fail: bool) {
            *self.fail_writes.lock().unwrap() = fail;
        }
    }

    impl KeyValueStore for MemoryStore {
        fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
            Ok(self.value(namespace, key))
        }

        fn put(&mut self, namespace: &str, key: &str, value: &str) -> Result<()> {
            if *self.fail_writes.lock().unwrap() {
                return Err(TrackerError::Storage("Mock write failure".to_string()));
            }
            *self.writes.lock().unwrap() += 1;
            self.entries
                .lock()
                .unwrap()
                .insert((namespace.to_string(), key.to_string()), value.to_string());
            Ok(())
        }
    }
}
