//! Transactional gateway.
//!
//! Every mutator follows the same envelope: begin a serializable
//! transaction, `SELECT … FOR UPDATE` the session row, re-read canonical
//! state, consult the idempotency log, validate and compute through the
//! pure engine, write, append the event ID, commit. Side effects are
//! returned to the caller and happen strictly after commit.

mod duel;
mod live;
mod repository;

pub use duel::*;
pub use live::*;
pub use repository::*;
