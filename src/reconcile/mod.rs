//! Timeout reconciler.
//!
//! Periodic sweeps that advance sessions past their deadlines: per-turn
//! expiry, deadline warnings with a cooldown, the 7-day hard cap,
//! disconnect-window forfeits for the live variant, and terminal-session
//! cleanup. Every session is processed in its own gateway transaction
//! under the usual event-ID discipline, so an overlapping run (or a cron
//! hit racing the in-process loop) cannot double-apply anything.

mod sweeper;

pub use sweeper::*;
