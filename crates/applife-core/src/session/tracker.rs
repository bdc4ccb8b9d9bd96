//! Legacy session tracker.

use std::collections::HashMap;
use std::sync::Arc;

use crate::device::DeviceInfo;
use crate::store::NamedStore;
use crate::timeutil;

use super::context::ContextData;
use super::record::{self, keys, SessionRecord};

/// Upper bound on a single session, independent of the configured timeout.
///
/// A session that appears longer than this (an app that never paused but has
/// clearly restarted, or a stale record) is discarded rather than reported.
pub const MAX_SESSION_LENGTH_SECONDS: u64 = 60 * 60 * 24 * 7;

/// The previous session's timestamps, returned from a start transition.
///
/// Present only when the start opened a genuinely new session and a previous
/// session existed; the caller uses it to build the "previous session"
/// payload on the dispatched response event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    /// Start timestamp of the previous session, epoch seconds.
    pub start_timestamp_secs: Option<u64>,
    /// Pause timestamp of the previous session, epoch seconds.
    pub pause_timestamp_secs: Option<u64>,
}

/// Computes install/upgrade/launch classification and classic session
/// bookkeeping against the legacy store namespace.
///
/// One tracker instance is scoped to one extension instance; the injected
/// store may be shared with other instances. Each transition loads a fresh
/// [`SessionRecord`] snapshot and performs single-key writes, accepting
/// last-writer-wins across instances.
pub struct SessionTracker {
    store: Arc<dyn NamedStore>,
    device_info: DeviceInfo,
    context_data: Option<HashMap<String, String>>,
}

impl SessionTracker {
    /// Creates a tracker over `store` with static `device_info`.
    #[must_use]
    pub fn new(store: Arc<dyn NamedStore>, device_info: DeviceInfo) -> Self {
        Self {
            store,
            device_info,
            context_data: None,
        }
    }

    /// Processes a start signal.
    ///
    /// Decides between install, continuation and new session, updates the
    /// persisted record accordingly and recomputes context data. Returns the
    /// previous session's timestamps when a new session began and a previous
    /// one existed; `None` for installs and continuations (the caller must
    /// not dispatch a session-start response event in those cases).
    pub fn start(
        &mut self,
        timestamp_secs: u64,
        additional_context_data: Option<&HashMap<String, String>>,
        advertising_id: Option<&str>,
        session_timeout_secs: u64,
        is_install: bool,
    ) -> Option<SessionInfo> {
        let previous = SessionRecord::load(&*self.store);

        if is_install {
            self.start_install_session(timestamp_secs, additional_context_data, advertising_id);
            return None;
        }

        if self.is_continuation(&previous, timestamp_secs, session_timeout_secs) {
            // The paused (or still running) session resumes: no launch
            // counted, no response event, start timestamp untouched.
            self.store.remove(keys::PAUSE_TIMESTAMP);
            self.store.set_bool(keys::SUCCESSFUL_CLOSE, false);
            self.context_data = Some(
                record::load_context_data(&*self.store).unwrap_or_else(|| {
                    ContextData::with_device_info(&self.device_info).into_map()
                }),
            );
            tracing::debug!(timestamp_secs, "lifecycle start within session, resuming");
            return None;
        }

        Some(self.start_new_session(
            &previous,
            timestamp_secs,
            additional_context_data,
            advertising_id,
        ))
    }

    /// Processes a pause signal.
    ///
    /// The pause timestamp is persisted only when it does not precede the
    /// current session's start (out-of-order delivery guard), and the session
    /// is marked successfully closed.
    pub fn pause(&self, timestamp_secs: u64) {
        let start_timestamp = SessionRecord::load(&*self.store)
            .start_timestamp
            .unwrap_or(0);
        if timestamp_secs < start_timestamp {
            tracing::debug!(
                timestamp_secs,
                start_timestamp,
                "dropping pause that predates session start"
            );
            return;
        }

        let session_length =
            timeutil::elapsed(start_timestamp, timestamp_secs).min(MAX_SESSION_LENGTH_SECONDS);
        self.store.set_bool(keys::SUCCESSFUL_CLOSE, true);
        self.store
            .set_i64(keys::PAUSE_TIMESTAMP, i64_from(timestamp_secs));
        tracing::debug!(timestamp_secs, session_length, "lifecycle paused");
    }

    /// Computes context data from persisted state without mutating it.
    ///
    /// Used when the host signals registration after a process restart with
    /// no start/pause yet observed: shared state is republished from whatever
    /// survived, and no install/launch counters move. Calling this twice
    /// yields identical data.
    #[must_use]
    pub fn compute_boot_data(&self, _timestamp_secs: u64) -> HashMap<String, String> {
        let mut map = record::load_context_data(&*self.store).unwrap_or_default();
        // Device facts win over whatever was persisted; they describe the
        // running process, not the one that wrote the map.
        map.extend(ContextData::with_device_info(&self.device_info).into_map());
        map
    }

    /// Returns the most recently computed context data.
    ///
    /// Falls back to the persisted map, then to device facts, when no start
    /// has been processed by this instance yet.
    #[must_use]
    pub fn context_data(&self) -> HashMap<String, String> {
        if let Some(data) = &self.context_data {
            return data.clone();
        }
        record::load_context_data(&*self.store)
            .unwrap_or_else(|| ContextData::with_device_info(&self.device_info).into_map())
    }

    fn is_continuation(
        &self,
        previous: &SessionRecord,
        timestamp_secs: u64,
        session_timeout_secs: u64,
    ) -> bool {
        if let Some(pause) = previous.pause_timestamp {
            return timeutil::elapsed(pause, timestamp_secs) < session_timeout_secs;
        }
        // No pause ever recorded: the session is still in progress unless it
        // has clearly outlived the maximum session bound (process restarted
        // without a pause, or a stale record from another instance).
        previous
            .start_timestamp
            .is_some_and(|start| timeutil::elapsed(start, timestamp_secs) <= MAX_SESSION_LENGTH_SECONDS)
    }

    fn start_install_session(
        &mut self,
        timestamp_secs: u64,
        additional_context_data: Option<&HashMap<String, String>>,
        advertising_id: Option<&str>,
    ) {
        let ts = i64_from(timestamp_secs);
        self.store.set_i64(keys::INSTALL_DATE, ts);
        self.store.set_i64(keys::LAST_USED_DATE, ts);
        self.store.set_i64(keys::LAUNCHES, 1);
        self.write_session_open(timestamp_secs);

        let mut context = ContextData::with_device_info(&self.device_info);
        context.install_event = true;
        context.launch_event = true;
        context.daily_engaged_event = true;
        context.monthly_engaged_event = true;
        context.install_date = Some(timeutil::short_date(timestamp_secs));
        context.launches = Some(1);
        context.days_since_first_use = Some(0);
        context.days_since_last_use = Some(0);
        context.hour_of_day = Some(timeutil::hour_of_day(timestamp_secs));
        context.day_of_week = Some(timeutil::day_of_week(timestamp_secs));
        context.advertising_identifier = advertising_id.map(str::to_string);
        if let Some(additional) = additional_context_data {
            context.additional = additional.clone();
        }

        self.finish_context(context);
        tracing::debug!(timestamp_secs, "lifecycle install session started");
    }

    fn start_new_session(
        &mut self,
        previous: &SessionRecord,
        timestamp_secs: u64,
        additional_context_data: Option<&HashMap<String, String>>,
        advertising_id: Option<&str>,
    ) -> SessionInfo {
        let current_version = self.device_info.application_version.clone();
        let is_upgrade = match (&previous.last_version, &current_version) {
            (Some(last), Some(current)) => last != current,
            _ => false,
        };
        let is_crash = previous.start_timestamp.is_some() && !previous.successful_close;
        let launches = previous.launches.saturating_add(1);

        self.store.set_i64(keys::LAUNCHES, i64_from(launches));
        self.write_session_open(timestamp_secs);
        self.store
            .set_i64(keys::LAST_USED_DATE, i64_from(timestamp_secs));
        if let Some(version) = &current_version {
            self.store.set_string(keys::LAST_VERSION, version);
        }
        if let Some(os) = self.device_info.formatted_operating_system() {
            self.store.set_string(keys::OS_VERSION, &os);
        }
        if let Some(app_id) = self.device_info.formatted_application_id() {
            self.store.set_string(keys::APP_ID, &app_id);
        }

        let mut context = ContextData::with_device_info(&self.device_info);
        context.launch_event = true;
        context.upgrade_event = is_upgrade;
        context.crash_event = is_crash;
        context.launches = Some(launches);
        context.hour_of_day = Some(timeutil::hour_of_day(timestamp_secs));
        context.day_of_week = Some(timeutil::day_of_week(timestamp_secs));
        context.advertising_identifier = advertising_id.map(str::to_string);

        if let Some(install_date) = previous.install_date {
            context.install_date = Some(timeutil::short_date(install_date));
            context.days_since_first_use =
                Some(timeutil::days_between(install_date, timestamp_secs));
        }
        if let Some(last_used) = previous.last_used_date {
            context.days_since_last_use = Some(timeutil::days_between(last_used, timestamp_secs));
            context.daily_engaged_event = !timeutil::same_calendar_day(last_used, timestamp_secs);
            context.monthly_engaged_event =
                !timeutil::same_calendar_month(last_used, timestamp_secs);
        }
        if let (Some(start), Some(pause)) = (previous.start_timestamp, previous.pause_timestamp) {
            if pause >= start {
                let length = pause - start;
                if length <= MAX_SESSION_LENGTH_SECONDS {
                    context.previous_session_length = Some(length);
                } else {
                    context.ignored_session_length = Some(length);
                }
            }
        }
        if is_crash {
            context.previous_os_version = previous.os_version.clone();
            context.previous_app_id = previous.app_id.clone();
        }
        if let Some(additional) = additional_context_data {
            context.additional = additional.clone();
        }

        self.finish_context(context);
        tracing::debug!(
            timestamp_secs,
            launches,
            is_upgrade,
            is_crash,
            "lifecycle new session started"
        );

        SessionInfo {
            start_timestamp_secs: previous.start_timestamp,
            pause_timestamp_secs: previous.pause_timestamp,
        }
    }

    fn write_session_open(&self, timestamp_secs: u64) {
        self.store
            .set_i64(keys::START_TIMESTAMP, i64_from(timestamp_secs));
        self.store.remove(keys::PAUSE_TIMESTAMP);
        self.store.set_bool(keys::SUCCESSFUL_CLOSE, false);
    }

    fn finish_context(&mut self, context: ContextData) {
        let map = context.into_map();
        record::save_context_data(&*self.store, &map);
        self.context_data = Some(map);
    }
}

fn i64_from(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
