use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::error::StoreError;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn io_error(key: &str, source: std::io::Error) -> StoreError {
        StoreError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(key, e))?;

        // Write then rename so a crash never leaves a half-written record.
        let path = self.key_path(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        std::fs::write(&tmp, value).map_err(|e| Self::io_error(key, e))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(Self::io_error(key, e));
        }
        debug!(key, path = %path.display(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }
}

/// In-memory store. Clones share the same entries, so a test can keep a
/// handle and inspect what the session manager wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
    fail_key: Arc<Mutex<Option<String>>>,
    fail_read_key: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` fail, as a full or unavailable store would.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `set` fail only for this key.
    pub fn fail_writes_for(&self, key: Option<&str>) {
        *self.fail_key.lock().unwrap_or_else(PoisonError::into_inner) = key.map(str::to_string);
    }

    /// Make `get` fail only for this key.
    pub fn fail_reads_for(&self, key: Option<&str>) {
        *self.fail_read_key.lock().unwrap_or_else(PoisonError::into_inner) = key.map(str::to_string);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_blocked(&self, key: &str) -> bool {
        if self.fail_writes.load(Ordering::SeqCst) {
            return true;
        }
        self.fail_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            == Some(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let read_blocked = self
            .fail_read_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            == Some(key);
        if read_blocked {
            return Err(StoreError::Unavailable(format!("read of '{}' rejected", key)));
        }
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.write_blocked(key) {
            return Err(StoreError::Unavailable(format!("write to '{}' rejected", key)));
        }
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data"));

        assert_eq!(store.get("auth_session").unwrap(), None);

        store.set("auth_session", "{\"a\":1}").unwrap();
        assert_eq!(store.get("auth_session").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.path().join("data").join("auth_session.json").exists());

        store.remove("auth_session").unwrap();
        assert_eq!(store.get("auth_session").unwrap(), None);
    }

    #[test]
    fn test_file_store_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.remove("user_info").is_ok());
    }

    #[test]
    fn test_file_store_overwrite_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.set("user_info", "one").unwrap();
        store.set("user_info", "two").unwrap();

        assert_eq!(store.get("user_info").unwrap().as_deref(), Some("two"));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["user_info.json".to_string()]);
    }

    #[test]
    fn test_file_store_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        // A non-empty directory in the way makes the rename fail.
        std::fs::create_dir_all(dir.path().join("user_info.json").join("blocker")).unwrap();

        assert!(store.set("user_info", "one").is_err());
        assert!(!dir.path().join(".user_info.json.tmp").exists());
    }

    #[test]
    fn test_memory_store_read_failures() {
        let store = MemoryStore::new();
        store.set("k", "v").unwrap();
        store.fail_reads_for(Some("k"));
        assert!(store.get("k").is_err());
        assert_eq!(store.get("other").unwrap(), None);

        store.fail_reads_for(None);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.set("k", "v").unwrap();
        assert_eq!(handle.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(handle.keys(), vec!["k".to_string()]);
    }

    #[test]
    fn test_memory_store_write_failures() {
        let store = MemoryStore::new();
        store.fail_writes(true);
        assert!(store.set("k", "v").is_err());
        assert!(store.is_empty());

        store.fail_writes(false);
        store.fail_writes_for(Some("user_info"));
        assert!(store.set("auth_session", "v").is_ok());
        assert!(store.set("user_info", "v").is_err());
        assert_eq!(store.keys(), vec!["auth_session".to_string()]);
    }
}
