//! JSON-file-backed durable store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{NamedStore, StoreError, StoreValue};

/// Durable [`NamedStore`] persisting a flat JSON map on every mutation.
///
/// Write failures degrade to the in-memory view: the mutation stays visible
/// to this process and a warning is logged, but it may not survive a restart.
/// Lifecycle computations already treat missing persisted state as a first
/// launch, so degraded durability never aborts signal processing.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: Arc<Mutex<HashMap<String, StoreValue>>>,
}

impl FileStore {
    /// Opens the store at `path`, loading any existing entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            entries: Arc::new(Mutex::new(entries)),
        })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoreValue>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn persist(&self, entries: &HashMap<String, StoreValue>) {
        let serialized = match serde_json::to_string_pretty(entries) {
            Ok(s) => s,
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "failed to serialize store");
                return;
            },
        };
        if let Err(error) = std::fs::write(&self.path, serialized) {
            tracing::warn!(
                path = %self.path.display(),
                %error,
                "failed to persist store, continuing with in-memory view"
            );
        }
    }
}

impl NamedStore for FileStore {
    fn get(&self, key: &str) -> Option<StoreValue> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: StoreValue) {
        let mut entries = self.lock();
        entries.insert(key.to_string(), value);
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.lock();
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }

    fn remove_all(&self) {
        let mut entries = self.lock();
        entries.clear();
        self.persist(&entries);
    }
}
