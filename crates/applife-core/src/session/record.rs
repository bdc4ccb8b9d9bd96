//! Persisted legacy session record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::store::NamedStore;

/// Persisted store keys owned by the legacy tracker.
///
/// Key names are stable across process restarts of the same installation;
/// nothing else in the store shares this namespace.
pub mod keys {
    /// Epoch seconds of the first-ever launch. Written once, never changed.
    pub const INSTALL_DATE: &str = "InstallDate";
    /// Epoch seconds of the most recent launch before the current one.
    pub const LAST_USED_DATE: &str = "LastDateUsed";
    /// Application version string seen at the last launch.
    pub const LAST_VERSION: &str = "LastVersion";
    /// Total number of launches.
    pub const LAUNCHES: &str = "Launches";
    /// Epoch seconds of the most recent pause.
    pub const PAUSE_TIMESTAMP: &str = "PauseDate";
    /// Epoch seconds of the current session's start.
    pub const START_TIMESTAMP: &str = "SessionStart";
    /// Whether the previous session recorded a pause before exiting.
    pub const SUCCESSFUL_CLOSE: &str = "SuccessfulClose";
    /// Operating system string seen at the last launch.
    pub const OS_VERSION: &str = "OsVersion";
    /// Application id string seen at the last launch.
    pub const APP_ID: &str = "AppId";
    /// JSON-serialized context data computed at the last launch.
    pub const CONTEXT_DATA: &str = "LifecycleData";
}

/// Snapshot of the legacy namespace, loaded at the start of a transition.
///
/// A transition loads one snapshot, decides, then performs single-key writes;
/// values are never cached across transitions (the store may have been
/// written by another instance in between).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Install date in epoch seconds; absent exactly once, then immutable.
    pub install_date: Option<u64>,
    /// Last launch date in epoch seconds.
    pub last_used_date: Option<u64>,
    /// Version string at the last launch.
    pub last_version: Option<String>,
    /// Launch counter.
    pub launches: u64,
    /// Pause timestamp in epoch seconds, cleared on each new session.
    pub pause_timestamp: Option<u64>,
    /// Start timestamp of the current session in epoch seconds.
    pub start_timestamp: Option<u64>,
    /// Whether the previous session paused before exiting.
    pub successful_close: bool,
    /// Operating system string at the last launch.
    pub os_version: Option<String>,
    /// Application id string at the last launch.
    pub app_id: Option<String>,
}

impl SessionRecord {
    /// Loads the current snapshot from `store`.
    #[must_use]
    pub fn load(store: &dyn NamedStore) -> Self {
        Self {
            install_date: get_u64(store, keys::INSTALL_DATE),
            last_used_date: get_u64(store, keys::LAST_USED_DATE),
            last_version: store.get_string(keys::LAST_VERSION),
            launches: get_u64(store, keys::LAUNCHES).unwrap_or(0),
            pause_timestamp: get_u64(store, keys::PAUSE_TIMESTAMP),
            start_timestamp: get_u64(store, keys::START_TIMESTAMP),
            successful_close: store.get_bool(keys::SUCCESSFUL_CLOSE).unwrap_or(false),
            os_version: store.get_string(keys::OS_VERSION),
            app_id: store.get_string(keys::APP_ID),
        }
    }
}

/// Loads the context data map persisted at the last launch, if any.
#[must_use]
pub fn load_context_data(store: &dyn NamedStore) -> Option<HashMap<String, String>> {
    let raw = store.get_string(keys::CONTEXT_DATA)?;
    match serde_json::from_str(&raw) {
        Ok(map) => Some(map),
        Err(error) => {
            tracing::warn!(%error, "discarding malformed persisted context data");
            None
        },
    }
}

/// Persists the context data map computed for the current launch.
pub fn save_context_data(store: &dyn NamedStore, context_data: &HashMap<String, String>) {
    match serde_json::to_string(context_data) {
        Ok(raw) => store.set_string(keys::CONTEXT_DATA, &raw),
        Err(error) => tracing::warn!(%error, "failed to serialize context data"),
    }
}

fn get_u64(store: &dyn NamedStore, key: &str) -> Option<u64> {
    store.get_i64(key).and_then(|v| u64::try_from(v).ok())
}
