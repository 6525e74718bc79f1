//! Key-value persistence for the client cache. No transactions: the last
//! writer wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt store file: {0}")]
    Corrupt(serde_json::Error),
    #[error("Failed to serialize store: {0}")]
    Serialize(serde_json::Error),
    #[error("Store lock poisoned")]
    Poisoned,
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// A JSON object on disk, rewritten in full on every mutation.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path, lock: Mutex::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(StoreError::Corrupt),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");
        let raw = serde_json::to_vec_pretty(entries).map_err(StoreError::Serialize)?;
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Contents to mutate from. A corrupt file is discarded so the next write replaces it.
    fn read_or_reset(&self) -> Result<HashMap<String, String>, StoreError> {
        match self.read_all() {
            Err(StoreError::Corrupt(e)) => {
                tracing::warn!("Discarding corrupt store file {}: {}", self.path.display(), e);
                Ok(HashMap::new())
            }
            other => other,
        }
    }
}

impl KeyValueStore for FileStore {
    /// A corrupt file reads as a miss.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_or_reset()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.read_or_reset()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(StoreError::Corrupt(e)) => {
                tracing::warn!("Resetting corrupt store file {}: {}", self.path.display(), e);
                return self.write_all(&HashMap::new());
            }
            Err(e) => return Err(e),
        };
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);
        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache").join("citations.json");

        let store = FileStore::open(&path).unwrap();
        store.set("k1", "v1").unwrap();
        store.set("k2", "v2").unwrap();
        store.delete("k1").unwrap();
        store.delete("missing").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("k1").unwrap(), None);
        assert_eq!(reopened.get("k2").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn test_file_store_corrupt_file_reads_as_miss() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("citations.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_store_recovers_from_corrupt_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("citations.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_store_delete_resets_corrupt_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("citations.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let store = FileStore::open(&path).unwrap();
        store.delete("k").unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<HashMap<String, String>>(&raw).unwrap().is_empty());
    }

    #[test]
    fn test_error_labels() {
        let parse = serde_json::from_str::<HashMap<String, String>>("nope").unwrap_err();
        assert!(StoreError::Corrupt(parse).to_string().starts_with("Corrupt store file"));
        let ser = serde_json::from_str::<HashMap<String, String>>("[").unwrap_err();
        assert!(StoreError::Serialize(ser).to_string().starts_with("Failed to serialize store"));
    }
}
