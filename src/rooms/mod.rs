//! Typed rooms and presence.
//!
//! Rooms are `<type>:<id>` multicast buckets with fixed capacities
//! (battle=2, game=8, spot=100, global=∞) plus an implicit `user:<uid>`
//! room per user. Membership is kept in a shared store so every server
//! instance sees the same roster; the in-process registry is the socket
//! fan-out path and the documented best-effort fallback when the shared
//! store is unreachable.

mod key;

pub use key::*;

#[cfg(feature = "server")]
mod registry;
#[cfg(feature = "server")]
pub use registry::*;

#[cfg(feature = "database")]
mod fabric;
#[cfg(feature = "database")]
pub use fabric::*;
#[cfg(feature = "database")]
mod presence;
#[cfg(feature = "database")]
pub use presence::*;
#[cfg(feature = "database")]
mod shared;
#[cfg(feature = "database")]
pub use shared::*;
