//! XDM session tracker.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bus::{CloseKind, EventSink, OutboundEvent};
use crate::device::DeviceInfo;
use crate::store::NamedStore;
use crate::timeutil;

use super::machine::SessionPhase;
use super::metrics::{
    CloseXdm, LaunchXdm, XdmApplication, XdmDevice, XdmEnvironment, EVENT_TYPE_APPLICATION_CLOSE,
    EVENT_TYPE_APPLICATION_LAUNCH,
};

/// Name of the dispatched application-launch event.
pub const EVENT_NAME_APPLICATION_LAUNCH: &str = "Application Launch (Foreground)";
/// Name of the dispatched application-close event.
pub const EVENT_NAME_APPLICATION_CLOSE: &str = "Application Close (Background)";

/// Backdate applied to `lastKnownTimestampMillis` when synthesizing a crash
/// close, so the close strictly precedes the start that triggered it.
pub const CLOSE_BACKDATE_MILLIS: u64 = 1000;

/// Persisted store keys owned by the XDM tracker.
pub mod keys {
    /// Epoch milliseconds of the current session's start.
    pub const APP_START_TIMESTAMP_MILLIS: &str = "v2AppStartTimestampMillis";
    /// Epoch milliseconds of the current session's pause.
    pub const APP_PAUSE_TIMESTAMP_MILLIS: &str = "v2AppPauseTimestampMillis";
    /// Epoch milliseconds of the current session's close.
    pub const APP_CLOSE_TIMESTAMP_MILLIS: &str = "v2AppCloseTimestampMillis";
    /// Most recent signal timestamp of any kind, epoch milliseconds.
    pub const LAST_KNOWN_TIMESTAMP_MILLIS: &str = "v2LastKnownTimestampMillis";
    /// Application version string seen at the last launch.
    pub const LAST_APP_VERSION: &str = "v2LastAppVersion";
    /// Explicit session phase.
    pub const SESSION_PHASE: &str = "v2SessionPhase";
}

/// Snapshot of the XDM namespace, loaded at the start of a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct XdmSessionRecord {
    app_start_timestamp_ms: Option<u64>,
    app_pause_timestamp_ms: Option<u64>,
    last_known_timestamp_ms: Option<u64>,
    last_app_version: Option<String>,
    phase: SessionPhase,
}

impl XdmSessionRecord {
    fn load(store: &dyn NamedStore) -> Self {
        Self {
            app_start_timestamp_ms: get_u64(store, keys::APP_START_TIMESTAMP_MILLIS),
            app_pause_timestamp_ms: get_u64(store, keys::APP_PAUSE_TIMESTAMP_MILLIS),
            last_known_timestamp_ms: get_u64(store, keys::LAST_KNOWN_TIMESTAMP_MILLIS),
            last_app_version: store.get_string(keys::LAST_APP_VERSION),
            phase: store
                .get_string(keys::SESSION_PHASE)
                .map_or(SessionPhase::Idle, |s| SessionPhase::parse(&s)),
        }
    }
}

/// Computes the schema-shaped application-launch/application-close event
/// pair and tracks the continuously updated last-known-alive timestamp used
/// to backdate crash closes.
///
/// Like the legacy tracker, one instance is scoped to one extension
/// instance, while the store may be shared: a second instance observing a
/// phase left `Started` by a first instance synthesizes that session's crash
/// close before dispatching its own launch.
pub struct XdmSessionTracker {
    store: Arc<dyn NamedStore>,
    device_info: DeviceInfo,
    sink: Arc<dyn EventSink>,
}

impl XdmSessionTracker {
    /// Creates a tracker over `store`, dispatching through `sink`.
    #[must_use]
    pub fn new(
        store: Arc<dyn NamedStore>,
        device_info: DeviceInfo,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            device_info,
            sink,
        }
    }

    /// Processes a start signal.
    ///
    /// When the previous session was left open, a close event with close
    /// type `unknown` is synthesized and dispatched first, backdated to the
    /// last known alive timestamp minus one second (or the persisted pause
    /// when that is newer than the prior start). Then the new session is
    /// recorded and an application-launch event is dispatched.
    pub fn on_start(
        &self,
        timestamp_ms: u64,
        is_install: bool,
        free_form_data: Option<&HashMap<String, String>>,
    ) {
        let record = XdmSessionRecord::load(&*self.store);

        if record.phase.is_open() {
            self.dispatch_crash_close(&record);
        }

        let is_upgrade = !is_install
            && match (&record.last_app_version, &self.device_info.application_version) {
                (Some(last), Some(current)) => last != current,
                _ => false,
            };

        self.store
            .set_i64(keys::APP_START_TIMESTAMP_MILLIS, i64_from(timestamp_ms));
        self.store.remove(keys::APP_PAUSE_TIMESTAMP_MILLIS);
        self.store.remove(keys::APP_CLOSE_TIMESTAMP_MILLIS);
        self.store
            .set_string(keys::SESSION_PHASE, SessionPhase::Started.as_str());
        if let Some(version) = &self.device_info.application_version {
            self.store.set_string(keys::LAST_APP_VERSION, version);
        }

        let xdm = LaunchXdm {
            event_type: EVENT_TYPE_APPLICATION_LAUNCH,
            timestamp: timeutil::iso8601_millis(timestamp_ms),
            environment: XdmEnvironment::from_device_info(&self.device_info),
            device: XdmDevice::from_device_info(&self.device_info),
            application: XdmApplication::launch(&self.device_info, is_install, is_upgrade),
        };
        self.dispatch_launch(&xdm, free_form_data);
        tracing::debug!(timestamp_ms, is_install, is_upgrade, "application launch dispatched");
    }

    /// Processes a pause signal with an explicit close classification.
    ///
    /// Dropped with a debug log when no session is open; the distinction
    /// between a terminate (`close`) and a background-without-terminate
    /// (`pause`) is the caller's, carried on the signal.
    pub fn on_pause(&self, timestamp_ms: u64, close_kind: CloseKind) {
        let record = XdmSessionRecord::load(&*self.store);
        if !record.phase.is_open() {
            tracing::debug!(timestamp_ms, "no session in progress, dropping pause");
            return;
        }

        self.store
            .set_i64(keys::APP_PAUSE_TIMESTAMP_MILLIS, i64_from(timestamp_ms));
        self.store
            .set_i64(keys::APP_CLOSE_TIMESTAMP_MILLIS, i64_from(timestamp_ms));
        self.store
            .set_string(keys::SESSION_PHASE, SessionPhase::Paused.as_str());

        let start_ms = record.app_start_timestamp_ms.unwrap_or(timestamp_ms);
        let session_length_secs = timeutil::elapsed(start_ms, timestamp_ms) / 1000;
        let xdm = CloseXdm {
            event_type: EVENT_TYPE_APPLICATION_CLOSE,
            timestamp: timeutil::iso8601_millis(timestamp_ms),
            application: XdmApplication::close(close_kind, session_length_secs),
        };
        self.dispatch_close(&xdm);
        tracing::debug!(
            timestamp_ms,
            session_length_secs,
            close_kind = %close_kind,
            "application close dispatched"
        );
    }

    /// Advances the persisted last-known-alive timestamp.
    ///
    /// Called on every inbound signal of any kind; a single scalar write,
    /// performed only when `timestamp_ms` exceeds the stored value so the
    /// timestamp is monotonically non-decreasing across restarts.
    pub fn update_last_known_timestamp(&self, timestamp_ms: u64) {
        let current = get_u64(&*self.store, keys::LAST_KNOWN_TIMESTAMP_MILLIS).unwrap_or(0);
        if timestamp_ms > current {
            self.store
                .set_i64(keys::LAST_KNOWN_TIMESTAMP_MILLIS, i64_from(timestamp_ms));
        }
    }

    fn dispatch_crash_close(&self, record: &XdmSessionRecord) {
        let prior_start_ms = record.app_start_timestamp_ms.unwrap_or(0);
        let close_timestamp_ms = match record.app_pause_timestamp_ms {
            Some(pause) if pause >= prior_start_ms => pause,
            _ => record
                .last_known_timestamp_ms
                .unwrap_or(prior_start_ms)
                .saturating_sub(CLOSE_BACKDATE_MILLIS),
        };
        let session_length_secs = timeutil::elapsed(prior_start_ms, close_timestamp_ms) / 1000;

        let xdm = CloseXdm {
            event_type: EVENT_TYPE_APPLICATION_CLOSE,
            timestamp: timeutil::iso8601_millis(close_timestamp_ms),
            application: XdmApplication::close(CloseKind::Unknown, session_length_secs),
        };
        self.dispatch_close(&xdm);
        tracing::debug!(
            prior_start_ms,
            close_timestamp_ms,
            "synthesized close for session left open"
        );
    }

    fn dispatch_launch(&self, xdm: &LaunchXdm, free_form_data: Option<&HashMap<String, String>>) {
        let mut payload = serde_json::Map::new();
        payload.insert("xdm".to_string(), json_value(xdm));
        if let Some(data) = free_form_data {
            payload.insert("data".to_string(), json_value(data));
        }
        self.sink.dispatch(OutboundEvent::new(
            EVENT_NAME_APPLICATION_LAUNCH,
            serde_json::Value::Object(payload),
        ));
    }

    fn dispatch_close(&self, xdm: &CloseXdm) {
        self.sink.dispatch(OutboundEvent::new(
            EVENT_NAME_APPLICATION_CLOSE,
            serde_json::json!({ "xdm": json_value(xdm) }),
        ));
    }
}

fn json_value<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

fn get_u64(store: &dyn NamedStore, key: &str) -> Option<u64> {
    store.get_i64(key).and_then(|v| u64::try_from(v).ok())
}

fn i64_from(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
