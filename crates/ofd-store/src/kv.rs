//! Durable key/value storage
//!
//! Narrow string-keyed, string-valued interface the session persists
//! through. [`MemoryStore`] backs tests; [`FileStore`] keeps one file per
//! key under a directory for native deployments.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

/// Storage-layer failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing medium failed
    #[error("storage failure for key `{key}`")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    /// A stored value could not be interpreted
    #[error("corrupt value under key `{key}`: {reason}")]
    Corrupt { key: String, reason: String },

    /// Image bytes were missing or undecodable when they were required
    #[error("image bytes unavailable for key `{key}`")]
    ImageBytes { key: String },
}

/// Durable string key/value storage
pub trait DurableStore {
    /// Read the value under `key`, `None` if absent
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value
    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove the value under `key`; absent keys are not an error
    fn delete(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: IndexMap<String, String>,
}

impl MemoryStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.shift_remove(key);
        Ok(())
    }
}

/// File-per-key store rooted at a directory
///
/// Keys are dot-delimited identifiers (`ofd.changeset`, `ofd.image.<hash>`)
/// and map directly to filenames.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Directory holding the key files
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::write(self.path_for(key), value).map_err(|source| StoreError::Io {
            key: key.to_string(),
            source,
        })
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryStore::new();
        store.put("a", "1").unwrap();

        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").unwrap(), None);

        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();

        store.put("ofd.changeset", "{}").unwrap();
        assert_eq!(
            store.get("ofd.changeset").unwrap().as_deref(),
            Some("{}")
        );

        store.delete("ofd.changeset").unwrap();
        assert_eq!(store.get("ofd.changeset").unwrap(), None);
        // Deleting twice stays quiet.
        store.delete("ofd.changeset").unwrap();
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = FileStore::open(dir.path()).unwrap();
            store.put("ofd.image.abc", "cGF5bG9hZA==").unwrap();
        }

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get("ofd.image.abc").unwrap().as_deref(),
            Some("cGF5bG9hZA==")
        );
    }
}
