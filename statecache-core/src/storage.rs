//! Pluggable string key-value backends.
//!
//! Both managers mirror data into a [`Storage`] when one is configured:
//! the cache under `cache_<key>` and the state store under
//! `<app_prefix>_state_<path>`. The in-memory structures stay the source of
//! truth for the session; storage is what survives a restart.

use crate::error::StorageError;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A string key-value store shaped like the browser `localStorage` API.
///
/// Implementations must be usable behind an `Arc` from several threads.
pub trait Storage: Send + Sync {
    /// Returns the stored text, or `None` if the key is absent.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Removes every key, including keys written by other components.
    fn clear(&self) -> Result<(), StorageError>;

    /// All keys currently stored, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Volatile storage backed by a `DashMap`.
///
/// # Examples
///
/// ```
/// use statecache_core::{MemoryStorage, Storage};
///
/// let storage = MemoryStorage::new();
/// storage.set_item("theme", "\"dark\"").unwrap();
/// assert_eq!(storage.get_item("theme").unwrap().as_deref(), Some("\"dark\""));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).map(|v| v.value().clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.items.clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items.iter().map(|e| e.key().clone()).collect())
    }
}

/// Durable storage kept as a single JSON object on disk.
///
/// The whole document is loaded on [`open`](FileStorage::open) and rewritten
/// (temp file + rename) after every mutation.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Opens `path`, creating an empty store if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let items = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            items: RwLock::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(items)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.write();
        items.insert(key.to_string(), value.to_string());
        self.flush(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.write();
        if items.remove(key).is_some() {
            self.flush(&items)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut items = self.items.write();
        items.clear();
        self.flush(&items)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_basic_ops() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("missing").unwrap(), None);

        storage.set_item("k1", "v1").unwrap();
        storage.set_item("k2", "v2").unwrap();
        assert_eq!(storage.get_item("k1").unwrap().as_deref(), Some("v1"));
        assert_eq!(storage.len(), 2);

        storage.remove_item("k1").unwrap();
        storage.remove_item("k1").unwrap();
        assert_eq!(storage.get_item("k1").unwrap(), None);

        let keys = storage.keys().unwrap();
        assert_eq!(keys, vec!["k2".to_string()]);

        storage.clear().unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set_item("cache_user", "{\"id\":1}").unwrap();
            storage.set_item("app_state_theme", "\"dark\"").unwrap();
            storage.remove_item("app_state_theme").unwrap();
        }

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get_item("cache_user").unwrap().as_deref(),
            Some("{\"id\":1}")
        );
        assert_eq!(reopened.get_item("app_state_theme").unwrap(), None);
    }

    #[test]
    fn test_file_storage_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("store.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set_item("k", "v").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_file_storage_rejects_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();

        let err = FileStorage::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
