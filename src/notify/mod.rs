//! Notification dispatch.
//!
//! One logical notification per observable state transition, routed to
//! push, email and in-app honoring per-user preferences and quiet hours.
//! Delivery backends are trait objects; failures on one channel never
//! touch the others and never reach the caller.

mod kind;
mod preferences;

pub use kind::*;
pub use preferences::*;

#[cfg(feature = "server")]
mod providers;
#[cfg(feature = "server")]
pub use providers::*;

#[cfg(feature = "database")]
mod dispatch;
#[cfg(feature = "database")]
pub use dispatch::*;
#[cfg(feature = "database")]
mod inbox;
#[cfg(feature = "database")]
pub use inbox::*;
