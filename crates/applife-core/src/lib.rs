//! Application lifecycle tracking engine.
//!
//! This crate computes an application's usage lifecycle — launches, installs,
//! upgrades, foreground/background sessions, and crash recovery — from a
//! stream of pre-classified start/pause/generic signals plus a persisted
//! key/value record of prior state. It emits two parallel representations of
//! that state:
//!
//! - a **legacy session-context map** (launch counters, engagement flags,
//!   days-since metrics) published as shared state and attached to a
//!   session-start response event, and
//! - a **schema-shaped (XDM) event pair**: an application-launch event and an
//!   application-close event with environment/device/application sub-objects.
//!
//! The host event bus, the persisted store, and the device information
//! provider are external collaborators; they are consumed through the
//! [`bus::EventSink`] and [`store::NamedStore`] seams and the
//! [`device::DeviceInfo`] facts struct. Signal delivery into a single
//! extension instance is serialized by the host, but the persisted store may
//! be shared across independent instances — crash recovery is store-mediated,
//! with last-writer-wins semantics on single-key reads and writes.

pub mod bus;
pub mod config;
pub mod device;
pub mod extension;
pub mod session;
pub mod store;
pub mod timeutil;
pub mod xdm;

pub use bus::{CloseKind, EventSink, OutboundEvent, Signal, SignalKind};
pub use config::LifecycleConfig;
pub use device::DeviceInfo;
pub use extension::{LifecycleExtension, EVENT_NAME_SESSION_START};
pub use session::{SessionInfo, SessionTracker, MAX_SESSION_LENGTH_SECONDS};
pub use store::{FileStore, MemoryStore, NamedStore, StoreValue};
pub use xdm::{XdmSessionTracker, EVENT_NAME_APPLICATION_CLOSE, EVENT_NAME_APPLICATION_LAUNCH};
