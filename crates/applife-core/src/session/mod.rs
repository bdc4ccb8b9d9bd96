//! Legacy session tracking.
//!
//! This module owns install/upgrade/launch-count detection and classic
//! session bookkeeping: start/pause timestamps, session length, crash
//! inference and the derived context-data map published as shared state.
//!
//! # Session decisions on start
//!
//! ```text
//!                         start(t)
//!                            │
//!              ┌─────────────┼──────────────────┐
//!       no install date   pause recorded     no pause
//!              │          t − pause < timeout    │
//!              ▼             │             within max bound?
//!          Install       Continuation      yes │        │ no
//!       (session #1)    (no new launch)        ▼        ▼
//!                                        Continuation  New session
//! ```
//!
//! Installs and continuations return no previous-session info, so the caller
//! dispatches no session-start response event for them. A new session bumps
//! the launch counter exactly once and classifies itself as an upgrade when
//! the stored version string differs from the current one.
//!
//! Crash inference is indirect: a session that never recorded a pause leaves
//! `SuccessfulClose` false, and the next new session reports the crash flag
//! in its context data.

pub mod context;
pub mod record;
pub mod tracker;


pub use context::ContextData;
pub use record::SessionRecord;
pub use tracker::{SessionInfo, SessionTracker, MAX_SESSION_LENGTH_SECONDS};
