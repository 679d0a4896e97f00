//! File-backed key-value storage
//!
//! All keys live in one JSON object file. Every `set` rewrites the file
//! through a sibling temporary file and a rename.

use sliceflow_core::environment::{KeyValueStorage, StorageError};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// [`KeyValueStorage`] persisted to a JSON file
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Storage at `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StorageError::ReadFailed(format!("{}: {e}", self.path.display()))),
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw)
            .map_err(|e| StorageError::ReadFailed(format!("{}: {e}", self.path.display())))
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let write_failed = |e: &dyn std::fmt::Display| StorageError::WriteFailed(format!("{}: {e}", self.path.display()));

        let json = serde_json::to_string_pretty(values).map_err(|e| write_failed(&e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_failed(&e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| write_failed(&e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| write_failed(&e))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        let mut values = self.read_all().map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("store.json"));

        assert_eq!(storage.get("count"), Ok(None));
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let storage = FileStorage::new(&path);
        storage.set("count", "3").unwrap();
        storage.set("employee", "[]").unwrap();
        storage.set("count", "4").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("count"), Ok(Some("4".to_string())));
        assert_eq!(reopened.get("employee"), Ok(Some("[]".to_string())));
    }

    #[test]
    fn test_corrupt_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ nope").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(storage.get("count"), Err(StorageError::ReadFailed(_))));
        assert!(matches!(storage.set("count", "1"), Err(StorageError::WriteFailed(_))));
    }
}
