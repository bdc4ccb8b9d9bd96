//! XDM session tracking.
//!
//! The XDM tracker runs beside the legacy tracker over the same store and
//! produces schema-shaped application-launch and application-close events
//! instead of a flat context map. It keeps its own persisted namespace
//! (`v2*` keys) and an explicit [`SessionPhase`], so an instance that finds
//! the phase still open at the next start knows the previous run never
//! closed and synthesizes a crash close for it, backdated to the last known
//! alive timestamp.
//!
//! Close classification is explicit: pause signals carry a
//! [`CloseKind`](crate::bus::CloseKind) distinguishing a graceful terminate
//! from a background-without-terminate, and synthesized crash closes report
//! `unknown`.

pub mod machine;
pub mod metrics;
pub mod tracker;


pub use machine::SessionPhase;
pub use metrics::{CloseXdm, LaunchXdm, XdmApplication, XdmDevice, XdmEnvironment, XdmLocale};
pub use tracker::{
    XdmSessionTracker, CLOSE_BACKDATE_MILLIS, EVENT_NAME_APPLICATION_CLOSE,
    EVENT_NAME_APPLICATION_LAUNCH,
};
