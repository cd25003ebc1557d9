//! Durable storage backends
//!
//! A [`StorageBackend`] is a synchronous key → document store. The artifact
//! store writes the whole persisted document under one fixed key after every
//! state change.

use crate::error::StorageError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Key → document storage
///
/// # Contract
/// - `read` of a key never written returns `Ok(None)`
/// - `write` replaces the whole document atomically from the reader's view
pub trait StorageBackend: Send + Sync + Debug {
    /// Read document
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write document
    ///
    /// # Errors
    /// Returns error if the backend cannot be written
    fn write(&self, key: &str, document: &str) -> Result<(), StorageError>;

    /// Remove document (missing keys are not an error)
    ///
    /// # Errors
    /// Returns error if the backend cannot be written
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create empty storage
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    /// Check if nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.documents.lock().get(key).cloned())
    }

    fn write(&self, key: &str, document: &str) -> Result<(), StorageError> {
        self.documents
            .lock()
            .insert(key.to_string(), document.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.documents.lock().remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Use (and create if needed) the given directory
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Storage directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(document) => Ok(Some(document)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, document: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, document)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
