//! Durable storage for the store's state.
//!
//! The whole state is one JSON record under a fixed name, rewritten wholesale
//! on every mutation and read once when the store opens.

use std::{
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{error::StorageError, store::StoreState};

/// Name of the persisted record.
pub const STORAGE_KEY: &str = "weather-storage";

pub trait StateStorage: Send + Sync + Debug {
    /// Returns `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<StoreState>, StorageError>;

    fn save(&self, state: &StoreState) -> Result<(), StorageError>;
}

/// JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `weather-storage.json` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(format!("{STORAGE_KEY}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io { path: self.path.clone(), source }
    }
}

impl StateStorage for FileStorage {
    fn load(&self) -> Result<Option<StoreState>, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        StoreState::from_record(&contents).map(Some).map_err(StorageError::Corrupt)
    }

    fn save(&self, state: &StoreState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(state).map_err(StorageError::Serialize)?;

        // Write then rename so a crash never leaves a half-written record.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        Ok(())
    }
}

/// In-process storage holding the serialized record. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    record: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a raw record, as if written by an earlier session.
    pub fn with_record(raw: impl Into<String>) -> Self {
        Self { record: Arc::new(Mutex::new(Some(raw.into()))) }
    }

    pub fn raw(&self) -> Option<String> {
        self.record.lock().clone()
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self) -> Result<Option<StoreState>, StorageError> {
        match self.record.lock().as_deref() {
            Some(raw) => StoreState::from_record(raw).map(Some).map_err(StorageError::Corrupt),
            None => Ok(None),
        }
    }

    fn save(&self, state: &StoreState) -> Result<(), StorageError> {
        let json = serde_json::to_string(state).map_err(StorageError::Serialize)?;
        *self.record.lock() = Some(json);
        Ok(())
    }
}
