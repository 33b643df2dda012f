//! PostgreSQL integration.
//!
//! Low-level connectivity, table-name constants, and the [`Schema`] trait
//! that keeps each entity's DDL next to its domain type. The gateway owns
//! all transactional access; nothing else writes.
//!
//! ## Connectivity
//!
//! - [`db()`] — Establishes a database connection from `DB_URL`
//! - [`migrate()`] — Runs `CREATE TABLE IF NOT EXISTS` + index DDL for
//!   every entity, including the reconciler-correctness indexes on
//!   `(status, deadline_at)` and `(status, turn_deadline_at)`

mod schema;

pub use schema::*;

use std::sync::Arc;
use tokio_postgres::Client;

/// Establishes a database connection.
///
/// Connects to PostgreSQL using the `DB_URL` environment variable and
/// returns an `Arc<Client>` suitable for sharing across async tasks.
///
/// # Panics
///
/// Panics if `DB_URL` is not set or if connection fails.
pub async fn db() -> Arc<Client> {
    Arc::new(connect().await)
}

/// Owned-connection variant for the gateway's writer, which needs
/// exclusive access to start transactions.
pub async fn connect() -> Client {
    log::info!("connecting to database");
    let tls = tokio_postgres::tls::NoTls;
    let ref url = std::env::var("DB_URL").expect("DB_URL must be set");
    let (client, connection) = tokio_postgres::connect(url, tls)
        .await
        .expect("database connection failed");
    tokio::spawn(connection);
    client
        .execute("SET client_min_messages TO WARNING", &[])
        .await
        .expect("set client_min_messages");
    client
}

/// PostgreSQL error type alias.
pub type PgErr = tokio_postgres::Error;

/// Table for async 1v1 duel sessions.
#[rustfmt::skip]
pub const GAMES:         &str = "games";
/// Table for submitted turns (one row per video).
#[rustfmt::skip]
pub const TURNS:         &str = "game_turns";
/// Table for BAIL disputes and their resolutions.
#[rustfmt::skip]
pub const DISPUTES:      &str = "game_disputes";
/// Table for live multi-player sessions.
#[rustfmt::skip]
pub const SESSIONS:      &str = "game_sessions";
/// Table for player profiles (names, penalties, preferences).
#[rustfmt::skip]
pub const PROFILES:      &str = "user_profiles";
/// Table for persisted in-app notifications.
#[rustfmt::skip]
pub const NOTIFICATIONS: &str = "notifications";
/// Table for shared room membership.
#[rustfmt::skip]
pub const ROOMS:         &str = "rooms";
/// Table for cross-instance presence.
#[rustfmt::skip]
pub const PRESENCE:      &str = "presence";
