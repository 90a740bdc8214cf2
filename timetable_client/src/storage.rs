use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::StoreError;
use crate::AppState;

/// Fixed key the whole application state is stored under.
pub const STORAGE_KEY: &str = "timetable-app-state";

/// Durable home of the persisted [`AppState`] blob.
pub trait StateStore: Send {
    fn load(&self) -> Result<Option<AppState>, StoreError>;
    fn save(&self, state: &AppState) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// Stores the state as `<dir>/timetable-app-state.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<AppState>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a temp file and renames it over the old state.
    fn save(&self, state: &AppState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(serde_json::to_string_pretty(state)?.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;
        tracing::trace!(path = %self.path.display(), "state saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store holding the serialized JSON. Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: &AppState) -> Self {
        let store = Self::default();
        *lock(&store.slot) = serde_json::to_string(state).ok();
        store
    }

    /// Raw JSON as last written.
    pub fn raw(&self) -> Option<String> {
        lock(&self.slot).clone()
    }

    pub fn save_count(&self) -> usize {
        *lock(&self.saves)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<AppState>, StoreError> {
        match lock(&self.slot).as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &AppState) -> Result<(), StoreError> {
        let json = serde_json::to_string(state)?;
        *lock(&self.slot) = Some(json);
        *lock(&self.saves) += 1;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *lock(&self.slot) = None;
        Ok(())
    }
}
