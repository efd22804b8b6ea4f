//! Storage backends.
//!
//! A [`StorageBackend`] holds the durable bytes of exactly one collection.
//! Production uses [`JsonFileBackend`]; tests use [`InMemoryBackend`] or a
//! failure-injecting double. The serialized-ordering guarantee lives in the
//! collection task, not here, so the backend contract stays minimal and the
//! storage engine can be swapped without touching callers.

use crate::errors::StoreError;
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Durable byte storage for a single collection.
pub trait StorageBackend: Send + 'static {
    /// Load the persisted bytes. `Ok(None)` means the collection has never
    /// been written: first-time initialization, the only case a caller may
    /// treat as empty.
    fn load(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Durably persist `bytes`, replacing any prior contents. Must not leave
    /// a partially written state behind on failure.
    fn persist(&mut self, bytes: &[u8]) -> Result<(), StoreError>;
}

/// File-backed storage writing atomically via temp file + fsync + rename.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io(&err)),
        }
    }

    fn persist(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(&e))?;
        }

        // Write atomically via temp file so a crash mid-write never leaves a
        // truncated collection behind.
        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(|e| StoreError::io(&e))?;
        file.write_all(bytes).map_err(|e| StoreError::io(&e))?;
        file.sync_all().map_err(|e| StoreError::io(&e))?;
        drop(file);

        std::fs::rename(&temp_path, &self.path).map_err(|e| StoreError::io(&e))
    }
}

/// In-memory backend for unit tests.
#[derive(Default, Clone)]
pub struct InMemoryBackend {
    bytes: Arc<Mutex<Option<Vec<u8>>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw persisted bytes, for assertions.
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.bytes.lock().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn load(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.bytes.lock().clone())
    }

    fn persist(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        *self.bytes.lock() = Some(bytes.to_vec());
        Ok(())
    }
}
