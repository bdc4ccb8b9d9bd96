//! Persisted key/value store seam.
//!
//! Both trackers read and write disjoint key namespaces within one flat named
//! collection of scalars. The store outlives the process; it is the only
//! channel through which independent tracker instances coordinate (crash
//! recovery reads state left behind by an instance that never paused).
//!
//! Implementations must tolerate concurrent use by multiple instances in the
//! same process. Coordination is last-writer-wins: every lifecycle transition
//! is a small number of single-key reads followed by single-key writes, with
//! no transactional isolation.

mod file;

pub use file::FileStore;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A scalar value held by a [`NamedStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    /// Signed 64-bit integer (timestamps, counters).
    Int(i64),
    /// Boolean flag.
    Bool(bool),
    /// UTF-8 string.
    Str(String),
}

impl StoreValue {
    /// Returns the integer value, if this is an `Int`.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value, if this is a `Str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for StoreValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for StoreValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for StoreValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for StoreValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

/// Errors raised when opening or persisting a durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file held malformed data.
    #[error("store parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A flat named collection of scalars surviving process restarts.
///
/// All operations are infallible from the caller's perspective: a store that
/// cannot attest to a value returns `None`, and implementations degrade to
/// in-memory behavior on write failure rather than erroring out. Lifecycle
/// computations treat a silent store as "first launch" territory.
pub trait NamedStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<StoreValue>;

    /// Stores `value` under `key`, replacing any existing value.
    fn set(&self, key: &str, value: StoreValue);

    /// Removes the value stored under `key`, if any.
    fn remove(&self, key: &str);

    /// Removes every key in the collection.
    fn remove_all(&self);

    /// Returns whether a value is stored under `key`.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the integer stored under `key`, if present and integral.
    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// Returns the boolean stored under `key`, if present and boolean.
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// Returns the string stored under `key`, if present and a string.
    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| match v {
            StoreValue::Str(s) => Some(s),
            _ => None,
        })
    }

    /// Stores an integer under `key`.
    fn set_i64(&self, key: &str, value: i64) {
        self.set(key, StoreValue::Int(value));
    }

    /// Stores a boolean under `key`.
    fn set_bool(&self, key: &str, value: bool) {
        self.set(key, StoreValue::Bool(value));
    }

    /// Stores a string under `key`.
    fn set_string(&self, key: &str, value: &str) {
        self.set(key, StoreValue::Str(value.to_string()));
    }
}

/// In-memory store backed by a shared map.
///
/// Clones share the same underlying map, which is how the cross-instance
/// crash scenario is exercised: two tracker instances constructed from clones
/// of one `MemoryStore` observe each other's writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, StoreValue>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoreValue>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl NamedStore for MemoryStore {
    fn get(&self, key: &str) -> Option<StoreValue> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: StoreValue) {
        self.lock().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    fn remove_all(&self) {
        self.lock().clear();
    }
}
