//! Event-bus interface types.
//!
//! The host bus delivers inbound [`Signal`]s (start, pause, boot, generic)
//! into the extension and receives [`OutboundEvent`]s and shared-state
//! updates through the [`EventSink`] seam. Dispatch is fire-and-forget: the
//! trackers never block on, or observe the fate of, an emitted event.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Kind of an inbound lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Foreground/start transition, pre-classified by the host.
    Start,
    /// Background/pause transition, pre-classified by the host.
    Pause,
    /// Host readiness signal delivered after registration, with no
    /// start/pause yet observed (process restart republication).
    Boot,
    /// Any other event; only advances the last-known timestamp.
    Generic,
}

/// How a session close should be classified on the emitted close event.
///
/// The distinction between a user-initiated background (`Pause`) and a
/// normal terminate (`Close`) is carried by the upstream signal, never
/// inferred by the tracker. `Unknown` is reserved for synthesized crash
/// closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseKind {
    /// The application was closed normally.
    Close,
    /// The application went to background without terminating.
    Pause,
    /// No pause was recorded; the close was synthesized at the next start.
    Unknown,
}

impl CloseKind {
    /// Returns the wire string for this close kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Pause => "pause",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CloseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound signal carrying a wall-clock timestamp in milliseconds.
#[derive(Debug, Clone)]
pub struct Signal {
    /// The signal kind.
    pub kind: SignalKind,
    /// Wall-clock timestamp in milliseconds since the epoch.
    pub timestamp_ms: u64,
    /// Optional caller-supplied free-form context data (start only).
    pub context_data: Option<HashMap<String, String>>,
    /// Optional advertising identifier (start only).
    pub advertising_id: Option<String>,
    /// Close classification for pause signals.
    pub close_kind: CloseKind,
}

impl Signal {
    /// Creates a start signal.
    #[must_use]
    pub const fn start(timestamp_ms: u64) -> Self {
        Self {
            kind: SignalKind::Start,
            timestamp_ms,
            context_data: None,
            advertising_id: None,
            close_kind: CloseKind::Close,
        }
    }

    /// Creates a pause signal classified as a normal close.
    #[must_use]
    pub const fn pause(timestamp_ms: u64) -> Self {
        Self {
            kind: SignalKind::Pause,
            timestamp_ms,
            context_data: None,
            advertising_id: None,
            close_kind: CloseKind::Close,
        }
    }

    /// Creates a pause signal classified as background-without-terminate.
    #[must_use]
    pub const fn background(timestamp_ms: u64) -> Self {
        Self {
            kind: SignalKind::Pause,
            timestamp_ms,
            context_data: None,
            advertising_id: None,
            close_kind: CloseKind::Pause,
        }
    }

    /// Creates a boot signal.
    #[must_use]
    pub const fn boot(timestamp_ms: u64) -> Self {
        Self {
            kind: SignalKind::Boot,
            timestamp_ms,
            context_data: None,
            advertising_id: None,
            close_kind: CloseKind::Close,
        }
    }

    /// Creates a generic signal.
    #[must_use]
    pub const fn generic(timestamp_ms: u64) -> Self {
        Self {
            kind: SignalKind::Generic,
            timestamp_ms,
            context_data: None,
            advertising_id: None,
            close_kind: CloseKind::Close,
        }
    }

    /// Attaches free-form context data.
    #[must_use]
    pub fn with_context_data(mut self, data: HashMap<String, String>) -> Self {
        self.context_data = Some(data);
        self
    }

    /// Attaches an advertising identifier.
    #[must_use]
    pub fn with_advertising_id(mut self, id: impl Into<String>) -> Self {
        self.advertising_id = Some(id.into());
        self
    }

    /// Returns the signal timestamp in whole seconds.
    #[must_use]
    pub const fn timestamp_secs(&self) -> u64 {
        self.timestamp_ms / 1000
    }
}

/// An event emitted by the trackers toward the host bus.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    /// Human-readable event name, e.g. `"Application Launch (Foreground)"`.
    pub name: String,
    /// Wire-shaped payload.
    pub payload: serde_json::Value,
}

impl OutboundEvent {
    /// Creates an outbound event.
    #[must_use]
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Sink for events and shared-state updates, implemented by the host bus.
///
/// Both methods are fire-and-forget; implementations must not block the
/// calling transition.
pub trait EventSink: Send + Sync {
    /// Dispatches an event onto the bus.
    fn dispatch(&self, event: OutboundEvent);

    /// Publishes the extension's shared state.
    fn publish_shared_state(&self, state: serde_json::Value);
}

/// Test double recording everything pushed through the sink.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<OutboundEvent>>,
    shared_states: Mutex<Vec<serde_json::Value>>,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every dispatched event, in order.
    #[must_use]
    pub fn events(&self) -> Vec<OutboundEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Returns a copy of every published shared state, in order.
    #[must_use]
    pub fn shared_states(&self) -> Vec<serde_json::Value> {
        self.shared_states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for RecordingSink {
    fn dispatch(&self, event: OutboundEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }

    fn publish_shared_state(&self, state: serde_json::Value) {
        self.shared_states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(state);
    }
}
