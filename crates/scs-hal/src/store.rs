//! Persistent key-value byte storage for calibration records.
//!
//! Values are written wholesale: a write replaces the previous value for the
//! key, with no append, versioning or backup.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use scs_types::ScsError;
use tracing::debug;

/// A byte store addressed by flat string keys.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.  Returns `Ok(None)` when the key has
    /// never been written.
    ///
    /// # Errors
    ///
    /// Returns [`ScsError::Storage`] when the backing medium cannot be read.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, ScsError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ScsError::Storage`] when the value cannot be written.
    fn write(&self, key: &str, value: &[u8]) -> Result<(), ScsError>;
}

// ────────────────────────────────────────────────────────────────────────────
// File-backed store
// ────────────────────────────────────────────────────────────────────────────

/// Stores each key as one file inside a root directory (e.g. the SD card
/// mount point).
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ScsError> {
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(ScsError::Storage(format!("invalid store key '{key}'")));
        }
        Ok(self.root.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, ScsError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ScsError::Storage(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), ScsError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).map_err(|e| {
            ScsError::Storage(format!("failed to create {}: {e}", self.root.display()))
        })?;
        fs::write(&path, value)
            .map_err(|e| ScsError::Storage(format!("failed to write {}: {e}", path.display())))?;
        debug!(path = %path.display(), bytes = value.len(), "store write");
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store
// ────────────────────────────────────────────────────────────────────────────

/// Volatile store for tests and simulation.  Can be told to fail writes to
/// exercise persistence-failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent [`write`][KeyValueStore::write] fail (or succeed
    /// again).
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, ScsError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), ScsError> {
        if *self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(ScsError::Storage(format!("write to '{key}' rejected")));
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_missing_key_reads_none() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let store = FileStore::new(dir.path());
        assert!(store.read("ai_pid.txt").unwrap().is_none());
    }

    #[test]
    fn file_store_write_replaces_previous_value() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let store = FileStore::new(dir.path().join("usd"));

        store.write("ai_pid.txt", b"20 0 100\n").unwrap();
        store.write("ai_pid.txt", b"21 0 97.5\n").unwrap();

        let bytes = store.read("ai_pid.txt").unwrap().unwrap();
        assert_eq!(bytes, b"21 0 97.5\n");
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let store = FileStore::new(dir.path());
        assert!(matches!(
            store.write("../escape", b"x"),
            Err(ScsError::Storage(_))
        ));
        assert!(store.read("").is_err());
    }

    #[test]
    fn memory_store_failing_writes_keep_old_value() {
        let store = MemoryStore::new();
        store.write("k", b"old").unwrap();
        store.set_fail_writes(true);
        assert!(store.write("k", b"new").is_err());
        assert_eq!(store.read("k").unwrap().unwrap(), b"old");
        assert_eq!(store.len(), 1);
    }
}
