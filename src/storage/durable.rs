//! Durable key/blob storage used to persist application state
//!
//! The state store only ever sees this trait; `FileStore` keeps one JSON
//! file per key and `MemoryStore` backs tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use crate::error::{SheetbookError, SheetbookResult};

use super::file_io::{read_text, remove_file_if_exists, write_atomic};

/// Key/blob storage that survives process restarts
pub trait DurableStore: Send + Sync {
    /// Replace the blob stored under `key`
    fn write(&self, key: &str, blob: &str) -> SheetbookResult<()>;

    /// Read the blob stored under `key`, `None` if absent
    fn read(&self, key: &str) -> SheetbookResult<Option<String>>;

    /// Remove the blob stored under `key`; absent keys are not an error
    fn remove(&self, key: &str) -> SheetbookResult<()>;
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> SheetbookResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(SheetbookError::Storage(format!(
                "Invalid storage key: {:?}",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl DurableStore for FileStore {
    fn write(&self, key: &str, blob: &str) -> SheetbookResult<()> {
        write_atomic(self.path_for(key)?, blob.as_bytes())
    }

    fn read(&self, key: &str) -> SheetbookResult<Option<String>> {
        read_text(self.path_for(key)?)
    }

    fn remove(&self, key: &str) -> SheetbookResult<()> {
        remove_file_if_exists(self.path_for(key)?)
    }
}

/// Volatile store, mostly for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn write(&self, key: &str, blob: &str) -> SheetbookResult<()> {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn read(&self, key: &str) -> SheetbookResult<Option<String>> {
        Ok(self
            .blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn remove(&self, key: &str) -> SheetbookResult<()> {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf());

        assert!(store.read("state").unwrap().is_none());
        store.write("state", r#"{"user":null}"#).unwrap();
        assert_eq!(
            store.read("state").unwrap().as_deref(),
            Some(r#"{"user":null}"#)
        );
        assert!(temp_dir.path().join("state.json").exists());

        store.remove("state").unwrap();
        assert!(store.read("state").unwrap().is_none());
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf());

        assert!(store.write("../escape", "x").is_err());
        assert!(store.write("", "x").is_err());
        assert!(store.read(".hidden").is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        store.write("k", "v").unwrap();
        assert_eq!(store.read("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert!(store.read("k").unwrap().is_none());
    }
}
