//! Explicit XDM session state machine.

use serde::{Deserialize, Serialize};

/// Phase of the XDM session, persisted alongside the session record.
///
/// The phase is stored explicitly rather than inferred from which persisted
/// keys happen to be present; "is there an open session" is a direct read,
/// which is what crash detection across instances depends on.
///
/// ```text
///            onStart                  onPause
///   Idle ───────────────▶ Started ───────────────▶ Paused
///                            │  ▲                     │
///        crash close + new   │  │       onStart       │
///        start (synthesized) └──┘◀────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No session record, or the previous session already closed.
    #[default]
    Idle,
    /// A session start was recorded and no close has been recorded since.
    Started,
    /// The session recorded a pause/close.
    Paused,
}

impl SessionPhase {
    /// Returns the persisted string for this phase.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Started => "started",
            Self::Paused => "paused",
        }
    }

    /// Parses a persisted phase string; anything unrecognized is `Idle`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "started" => Self::Started,
            "paused" => Self::Paused,
            _ => Self::Idle,
        }
    }

    /// Returns whether a session is currently open (started, not closed).
    ///
    /// An open phase observed at the next start means the previous session
    /// never closed and a crash close must be synthesized for it.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Started)
    }
}
