//! Snapshot persistence backends.
//!
//! The height cache persists through a minimal key → JSON interface with no
//! transactional guarantees. Any durable store can sit behind it; callers
//! treat every failure as best-effort.

use crate::model::StoreError;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Key → JSON value store used for height-cache snapshots.
pub trait SnapshotStore {
    /// Read the value under `key`. `Ok(None)` if absent.
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Process-local store. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    ///
    /// Keys are restricted to ASCII alphanumerics, `-`, `_` and `.` (not
    /// leading) so they can never escape the directory.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SnapshotStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key)?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let contents = serde_json::to_string(value)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp);
            StoreError::Io {
                path: path.clone(),
                source,
            }
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_store_get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("heights").unwrap().is_none());
    }

    #[test]
    fn memory_store_set_get_remove() {
        let mut store = MemoryStore::new();
        store.set("heights", &json!([1, 2, 3])).unwrap();
        assert_eq!(store.get("heights").unwrap(), Some(json!([1, 2, 3])));
        assert_eq!(store.len(), 1);

        store.remove("heights").unwrap();
        assert!(store.get("heights").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn file_store_round_trips_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("nested"));

        store.set("heights", &json!({"a": 1})).unwrap();
        assert_eq!(store.get("heights").unwrap(), Some(json!({"a": 1})));
        assert!(dir.path().join("nested").join("heights.json").exists());
    }

    #[test]
    fn file_store_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.get("heights").unwrap().is_none());
    }

    #[test]
    fn file_store_malformed_file_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("heights.json"), "{ truncated").unwrap();
        let store = FileStore::new(dir.path());

        assert!(matches!(store.get("heights"), Err(StoreError::Json(_))));
    }

    #[test]
    fn file_store_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        assert!(store.remove("never-written").is_ok());
    }

    #[test]
    fn failed_rename_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory where the snapshot file should go.
        std::fs::create_dir_all(dir.path().join("heights.json").join("inner")).unwrap();
        let mut store = FileStore::new(dir.path());

        let result = store.set("heights", &json!([1]));

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(!dir.path().join("heights.json.tmp").exists());
    }

    #[test]
    fn file_store_rejects_path_escaping_keys() {
        let store = FileStore::new("/tmp/streamlist-store");
        for key in ["", "../etc/passwd", "a/b", ".hidden", "sp ace"] {
            assert!(
                matches!(store.path_for(key), Err(StoreError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
        assert!(store.path_for("streamlist.heights-v1").is_ok());
    }
}
