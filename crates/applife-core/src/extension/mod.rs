//! Extension wiring.
//!
//! [`LifecycleExtension`] owns one legacy [`SessionTracker`] and one
//! [`XdmSessionTracker`] over the same injected store and routes inbound
//! signals to both. The host serializes delivery into a single instance;
//! anything shared between instances goes through the store.
//!
//! Every signal keeps the last-known-alive timestamp current. For start
//! signals the update lands after start handling: the crash close
//! synthesized there is backdated to the timestamp the crashed process left
//! behind, which an earlier update would overwrite with the current start.
//! Start and pause signals are processed only when configuration is
//! available; one arriving with no configuration is dropped with a debug
//! log, since the session timeout it needs has no trustworthy value yet.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bus::{EventSink, OutboundEvent, Signal, SignalKind};
use crate::config::LifecycleConfig;
use crate::device::DeviceInfo;
use crate::session::record::keys as session_keys;
use crate::session::{SessionTracker, MAX_SESSION_LENGTH_SECONDS};
use crate::store::NamedStore;
use crate::timeutil;
use crate::xdm::XdmSessionTracker;

/// Name of the legacy session-start response event.
pub const EVENT_NAME_SESSION_START: &str = "LifecycleStart";

/// Routes lifecycle signals into the legacy and XDM trackers.
pub struct LifecycleExtension {
    store: Arc<dyn NamedStore>,
    sink: Arc<dyn EventSink>,
    session_tracker: SessionTracker,
    xdm_tracker: XdmSessionTracker,
}

impl LifecycleExtension {
    /// Creates an extension instance over `store`, emitting through `sink`.
    #[must_use]
    pub fn new(
        store: Arc<dyn NamedStore>,
        device_info: DeviceInfo,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let session_tracker = SessionTracker::new(store.clone(), device_info.clone());
        let xdm_tracker = XdmSessionTracker::new(store.clone(), device_info, sink.clone());
        Self {
            store,
            sink,
            session_tracker,
            xdm_tracker,
        }
    }

    /// Handles one inbound signal.
    ///
    /// Start and pause signals require configuration; without it they are
    /// dropped, though the last-known timestamp still advances. Boot and
    /// generic signals never need configuration.
    pub fn handle_signal(&mut self, signal: &Signal, config: Option<&LifecycleConfig>) {
        match signal.kind {
            SignalKind::Start => {
                if let Some(config) = config {
                    self.handle_start(signal, config);
                } else {
                    tracing::debug!(
                        timestamp_ms = signal.timestamp_ms,
                        "no configuration available, dropping start signal"
                    );
                }
                // Only after start handling: the crash close synthesized
                // above reads the last-known timestamp the crashed process
                // wrote, and this write would replace it.
                self.xdm_tracker
                    .update_last_known_timestamp(signal.timestamp_ms);
            }
            SignalKind::Pause => {
                self.xdm_tracker
                    .update_last_known_timestamp(signal.timestamp_ms);
                if config.is_none() {
                    tracing::debug!(
                        timestamp_ms = signal.timestamp_ms,
                        "no configuration available, dropping pause signal"
                    );
                    return;
                }
                self.handle_pause(signal);
            }
            SignalKind::Boot => {
                self.xdm_tracker
                    .update_last_known_timestamp(signal.timestamp_ms);
                self.handle_boot(signal);
            }
            SignalKind::Generic => {
                self.xdm_tracker
                    .update_last_known_timestamp(signal.timestamp_ms);
            }
        }
    }

    fn handle_start(&mut self, signal: &Signal, config: &LifecycleConfig) {
        let timestamp_secs = signal.timestamp_secs();
        // First launch ever against this store: the install date is written
        // exactly once, on this path, and never overwritten afterwards.
        let is_install = !self.store.contains(session_keys::INSTALL_DATE);

        let previous_session = self.session_tracker.start(
            timestamp_secs,
            signal.context_data.as_ref(),
            signal.advertising_id.as_deref(),
            config.session_timeout_secs(),
            is_install,
        );

        // On a continuation the persisted start is the original session's;
        // on a new session it was just written to the signal timestamp.
        let session_start_secs = self
            .store
            .get_i64(session_keys::START_TIMESTAMP)
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(0);
        self.publish_shared_state(self.session_tracker.context_data(), session_start_secs);

        if let Some(info) = previous_session {
            let payload = serde_json::json!({
                "lifecyclecontextdata": self.session_tracker.context_data(),
                "starttimestampmillis": timeutil::secs_to_millis(timestamp_secs),
                "maxsessionlength": MAX_SESSION_LENGTH_SECONDS,
                "previoussessionstarttimestampmillis":
                    timeutil::secs_to_millis(info.start_timestamp_secs.unwrap_or(0)),
                "previoussessionpausetimestampmillis":
                    timeutil::secs_to_millis(info.pause_timestamp_secs.unwrap_or(0)),
            });
            self.sink
                .dispatch(OutboundEvent::new(EVENT_NAME_SESSION_START, payload));
        }

        self.xdm_tracker
            .on_start(signal.timestamp_ms, is_install, signal.context_data.as_ref());
    }

    fn handle_pause(&mut self, signal: &Signal) {
        self.session_tracker.pause(signal.timestamp_secs());
        self.xdm_tracker
            .on_pause(signal.timestamp_ms, signal.close_kind);
    }

    /// Republishes shared state from persisted data after a process restart,
    /// without fabricating a session or moving any counter.
    ///
    /// No session is in progress at boot, so the session-start timestamp is
    /// published as zero; only the context map is recovered.
    fn handle_boot(&mut self, signal: &Signal) {
        let data = self
            .session_tracker
            .compute_boot_data(signal.timestamp_secs());
        self.publish_shared_state(data, 0);
        tracing::debug!(
            timestamp_ms = signal.timestamp_ms,
            "republished lifecycle shared state on boot"
        );
    }

    fn publish_shared_state(&self, context_data: HashMap<String, String>, session_start_secs: u64) {
        self.sink.publish_shared_state(serde_json::json!({
            "sessionstarttimestamp": session_start_secs,
            "maxsessionlength": MAX_SESSION_LENGTH_SECONDS,
            "lifecyclecontextdata": context_data,
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use proptest::prelude::*;

    use crate::bus::{CloseKind, RecordingSink, Signal};
    use crate::config::LifecycleConfig;
    use crate::device::DeviceInfo;
    use crate::session::record::keys as session_keys;
    use crate::store::{MemoryStore, NamedStore};
    use crate::timeutil;
    use crate::xdm::tracker::keys as xdm_keys;
    use crate::xdm::{CLOSE_BACKDATE_MILLIS, EVENT_NAME_APPLICATION_CLOSE, EVENT_NAME_APPLICATION_LAUNCH};

    use super::*;

    const T0_MS: u64 = 1_787_997_842_000;
    const T0_S: u64 = T0_MS / 1000;

    fn test_device_info() -> DeviceInfo {
        DeviceInfo {
            application_name: Some("TEST_APPLICATION_NAME".to_string()),
            application_identifier: Some("TEST_PACKAGE_NAME".to_string()),
            application_version: Some("1.1".to_string()),
            application_version_code: Some("12345".to_string()),
            operating_system_name: Some("TEST_OS".to_string()),
            operating_system_version: Some("5.55".to_string()),
            locale_language: Some("en".to_string()),
            locale_country: Some("US".to_string()),
            ..DeviceInfo::default()
        }
    }

    fn extension_with(store: &MemoryStore) -> (LifecycleExtension, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let extension = LifecycleExtension::new(
            Arc::new(store.clone()),
            test_device_info(),
            sink.clone(),
        );
        (extension, sink)
    }

    fn config_with_timeout(secs: u64) -> LifecycleConfig {
        LifecycleConfig {
            session_timeout: std::time::Duration::from_secs(secs),
        }
    }

    #[test]
    fn test_install_start_publishes_state_and_dispatches_launch_only() {
        let store = MemoryStore::new();
        let (mut extension, sink) = extension_with(&store);
        let config = LifecycleConfig::default();

        extension.handle_signal(&Signal::start(T0_MS), Some(&config));

        // Install: no previous session, so only the XDM launch is dispatched.
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, EVENT_NAME_APPLICATION_LAUNCH);
        assert_eq!(
            events[0].payload["xdm"]["application"]["isInstall"],
            serde_json::json!(true)
        );

        let states = sink.shared_states();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0]["sessionstarttimestamp"], serde_json::json!(T0_S));
        assert_eq!(
            states[0]["maxsessionlength"],
            serde_json::json!(MAX_SESSION_LENGTH_SECONDS)
        );
        assert_eq!(
            states[0]["lifecyclecontextdata"]["installevent"],
            serde_json::json!("InstallEvent")
        );

        assert_eq!(store.get_i64(session_keys::INSTALL_DATE), Some(T0_S as i64));
    }

    #[test]
    fn test_start_without_config_is_dropped_but_advances_last_known() {
        let store = MemoryStore::new();
        let (mut extension, sink) = extension_with(&store);

        extension.handle_signal(&Signal::start(T0_MS), None);

        assert!(sink.events().is_empty());
        assert!(sink.shared_states().is_empty());
        assert!(!store.contains(session_keys::INSTALL_DATE));
        assert_eq!(
            store.get_i64(xdm_keys::LAST_KNOWN_TIMESTAMP_MILLIS),
            Some(T0_MS as i64)
        );
    }

    #[test]
    fn test_pause_without_config_is_dropped() {
        let store = MemoryStore::new();
        let (mut extension, sink) = extension_with(&store);
        let config = LifecycleConfig::default();

        extension.handle_signal(&Signal::start(T0_MS), Some(&config));
        extension.handle_signal(&Signal::pause(T0_MS + 5000), None);

        assert_eq!(sink.events().len(), 1);
        assert!(!store.contains(session_keys::PAUSE_TIMESTAMP));
    }

    #[test]
    fn test_new_session_dispatches_legacy_response_event() {
        let store = MemoryStore::new();
        let (mut extension, sink) = extension_with(&store);
        let config = config_with_timeout(30);

        extension.handle_signal(&Signal::start(T0_MS), Some(&config));
        extension.handle_signal(&Signal::pause(T0_MS + 10_000), Some(&config));
        // Well past the timeout: a new session with a response event.
        extension.handle_signal(&Signal::start(T0_MS + 100_000), Some(&config));

        let events = sink.events();
        let start_events: Vec<_> = events
            .iter()
            .filter(|e| e.name == EVENT_NAME_SESSION_START)
            .collect();
        assert_eq!(start_events.len(), 1);
        assert_eq!(
            start_events[0].payload["previoussessionstarttimestampmillis"],
            serde_json::json!(T0_MS)
        );
        assert_eq!(
            start_events[0].payload["previoussessionpausetimestampmillis"],
            serde_json::json!(T0_MS + 10_000)
        );
        // The response event also carries the new session's own facts.
        assert_eq!(
            start_events[0].payload["starttimestampmillis"],
            serde_json::json!(T0_MS + 100_000)
        );
        assert_eq!(
            start_events[0].payload["maxsessionlength"],
            serde_json::json!(MAX_SESSION_LENGTH_SECONDS)
        );
        assert_eq!(
            start_events[0].payload["lifecyclecontextdata"]["launchevent"],
            serde_json::json!("LaunchEvent")
        );
        assert_eq!(
            start_events[0].payload["lifecyclecontextdata"]["prevsessionlength"],
            serde_json::json!("10")
        );
    }

    #[test]
    fn test_continuation_dispatches_no_response_event() {
        let store = MemoryStore::new();
        let (mut extension, sink) = extension_with(&store);
        let config = LifecycleConfig::default();

        extension.handle_signal(&Signal::start(T0_MS), Some(&config));
        extension.handle_signal(&Signal::pause(T0_MS + 10_000), Some(&config));
        // Ten seconds later, inside the five-minute timeout.
        extension.handle_signal(&Signal::start(T0_MS + 20_000), Some(&config));

        assert!(sink
            .events()
            .iter()
            .all(|e| e.name != EVENT_NAME_SESSION_START));
        // Continuation keeps the original session start in shared state.
        let states = sink.shared_states();
        assert_eq!(
            states.last().unwrap()["sessionstarttimestamp"],
            serde_json::json!(T0_S)
        );
    }

    #[test]
    fn test_boot_republishes_persisted_state_without_counting_a_launch() {
        let store = MemoryStore::new();
        let (mut extension, _) = extension_with(&store);
        let config = LifecycleConfig::default();
        extension.handle_signal(&Signal::start(T0_MS), Some(&config));
        let launches_before = store.get_i64(session_keys::LAUNCHES);

        let (mut rebooted, sink) = extension_with(&store);
        rebooted.handle_signal(&Signal::boot(T0_MS + 50_000), None);
        rebooted.handle_signal(&Signal::boot(T0_MS + 60_000), None);

        assert!(sink.events().is_empty());
        let states = sink.shared_states();
        assert_eq!(states.len(), 2);
        // Idempotent: both publications carry identical context data.
        assert_eq!(states[0]["lifecyclecontextdata"], states[1]["lifecyclecontextdata"]);
        // No session is in progress at boot; the start timestamp is zero.
        assert_eq!(states[0]["sessionstarttimestamp"], serde_json::json!(0));
        assert_eq!(store.get_i64(session_keys::LAUNCHES), launches_before);
    }

    #[test]
    fn test_generic_signal_only_advances_last_known() {
        let store = MemoryStore::new();
        let (mut extension, sink) = extension_with(&store);

        extension.handle_signal(&Signal::generic(T0_MS), None);

        assert!(sink.events().is_empty());
        assert!(sink.shared_states().is_empty());
        assert_eq!(
            store.get_i64(xdm_keys::LAST_KNOWN_TIMESTAMP_MILLIS),
            Some(T0_MS as i64)
        );
    }

    #[test]
    fn test_crash_recovery_end_to_end_across_instances() {
        let store = MemoryStore::new();
        let config = LifecycleConfig::default();

        let (mut first, _) = extension_with(&store);
        first.handle_signal(&Signal::start(T0_MS), Some(&config));
        first.handle_signal(&Signal::generic(T0_MS + 40_000), Some(&config));
        // First instance disappears without ever pausing.

        let (mut second, sink) = extension_with(&store);
        // Past the maximum session bound, so the pause-less legacy record
        // counts as a crashed session rather than one still in progress.
        let restart_ms = T0_MS + (MAX_SESSION_LENGTH_SECONDS + 3600) * 1000;
        second.handle_signal(&Signal::start(restart_ms), Some(&config));

        let events = sink.events();
        // Legacy response event first, then the synthesized XDM close, then
        // the new launch.
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].name, EVENT_NAME_SESSION_START);
        assert_eq!(events[1].name, EVENT_NAME_APPLICATION_CLOSE);
        assert_eq!(
            events[1].payload["xdm"]["application"]["closeType"],
            serde_json::json!("unknown")
        );
        // Backdated to the generic tick the crashed instance last reported,
        // not to the restart: the days-later relaunch must not shift the
        // close forward or inflate the crashed session's length.
        assert_eq!(
            events[1].payload["xdm"]["timestamp"],
            serde_json::json!(timeutil::iso8601_millis(
                T0_MS + 40_000 - CLOSE_BACKDATE_MILLIS
            ))
        );
        assert_eq!(
            events[1].payload["xdm"]["application"]["sessionLength"],
            serde_json::json!(39)
        );
        assert_eq!(events[2].name, EVENT_NAME_APPLICATION_LAUNCH);

        // Legacy context flags the crash on the new session.
        let states = sink.shared_states();
        assert_eq!(
            states[0]["lifecyclecontextdata"]["crashevent"],
            serde_json::json!("CrashEvent")
        );
    }

    #[test]
    fn test_install_date_survives_subsequent_sessions() {
        let store = MemoryStore::new();
        let (mut extension, _) = extension_with(&store);
        let config = config_with_timeout(30);

        extension.handle_signal(&Signal::start(T0_MS), Some(&config));
        extension.handle_signal(&Signal::pause(T0_MS + 5000), Some(&config));
        extension.handle_signal(&Signal::start(T0_MS + 900_000), Some(&config));

        assert_eq!(store.get_i64(session_keys::INSTALL_DATE), Some(T0_S as i64));
    }

    #[test]
    fn test_free_form_data_reaches_both_trackers() {
        let store = MemoryStore::new();
        let (mut extension, sink) = extension_with(&store);
        let config = LifecycleConfig::default();

        let data = HashMap::from([("campaign".to_string(), "spring".to_string())]);
        extension.handle_signal(
            &Signal::start(T0_MS).with_context_data(data),
            Some(&config),
        );

        let events = sink.events();
        assert_eq!(
            events[0].payload["data"]["campaign"],
            serde_json::json!("spring")
        );
        assert_eq!(
            sink.shared_states()[0]["lifecyclecontextdata"]["campaign"],
            serde_json::json!("spring")
        );
    }

    proptest! {
        #[test]
        fn prop_last_known_timestamp_never_decreases(
            timestamps in proptest::collection::vec(0_u64..=u64::from(u32::MAX) * 1000, 1..40)
        ) {
            let store = MemoryStore::new();
            let (mut extension, _) = extension_with(&store);

            let mut max_seen = 0_u64;
            for ts in timestamps {
                extension.handle_signal(&Signal::generic(ts), None);
                max_seen = max_seen.max(ts);
                prop_assert_eq!(
                    store.get_i64(xdm_keys::LAST_KNOWN_TIMESTAMP_MILLIS),
                    Some(max_seen as i64)
                );
            }
        }

        #[test]
        fn prop_session_length_never_negative(
            start_ms in 0_u64..=u64::from(u32::MAX) * 1000,
            delta_ms in -600_000_i64..600_000_i64,
        ) {
            let store = MemoryStore::new();
            let (mut extension, sink) = extension_with(&store);
            let config = LifecycleConfig::default();

            extension.handle_signal(&Signal::start(start_ms), Some(&config));
            let pause_ms = start_ms.saturating_add_signed(delta_ms);
            extension.handle_signal(&Signal::pause(pause_ms), Some(&config));

            for event in sink.events() {
                if event.name == EVENT_NAME_APPLICATION_CLOSE {
                    let length = event.payload["xdm"]["application"]["sessionLength"]
                        .as_u64()
                        .unwrap();
                    prop_assert!(length <= 600);
                }
            }
        }

        #[test]
        fn prop_pause_close_kind_round_trips(close in prop_oneof![
            Just(CloseKind::Close),
            Just(CloseKind::Pause),
        ]) {
            let store = MemoryStore::new();
            let (mut extension, sink) = extension_with(&store);
            let config = LifecycleConfig::default();

            extension.handle_signal(&Signal::start(T0_MS), Some(&config));
            let mut pause = Signal::pause(T0_MS + 2000);
            pause.close_kind = close;
            extension.handle_signal(&pause, Some(&config));

            let closes: Vec<_> = sink
                .events()
                .into_iter()
                .filter(|e| e.name == EVENT_NAME_APPLICATION_CLOSE)
                .collect();
            prop_assert_eq!(closes.len(), 1);
            prop_assert_eq!(
                &closes[0].payload["xdm"]["application"]["closeType"],
                &serde_json::json!(close.as_str())
            );
        }
    }
}
