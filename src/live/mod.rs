//! Live multi-player variant.
//!
//! Sessions reached over the socket transport: up to eight ordered player
//! slots, a setter/attempt rotation that skips eliminated players,
//! disconnect-pause with a reconnect window, and 60-second turns. The
//! engine is pure; the socket layer and gateway wrap it the same way the
//! duel engine is wrapped.

mod command;
pub mod engine;
mod limits;
mod protocol;
mod session;

pub use command::*;
pub use limits::*;
pub use protocol::*;
pub use session::*;
