//! Server core for asynchronous S.K.A.T.E. video duels.
//!
//! A pure rules core (`rules`, `duel::engine`, `live::engine`) wrapped by a
//! transactional gateway over PostgreSQL, an HTTP surface for the async 1v1
//! variant, a websocket surface for the live multi-player variant, typed
//! rooms, a notification dispatcher, and a periodic reconciler.

pub mod duel;
pub mod live;
pub mod rules;

pub mod notify;
pub mod rooms;

#[cfg(feature = "database")]
pub mod gateway;
#[cfg(feature = "database")]
pub mod pg;
#[cfg(feature = "database")]
pub mod reconcile;
#[cfg(feature = "database")]
pub mod server;

/// Turn number within a session, 1-indexed and dense.
pub type TurnNumber = i32;
/// Clip duration in milliseconds.
pub type Millis = i32;

/// Random instance generation for testing.
pub trait Arbitrary {
    fn random() -> Self;
}

/// Unique identifier trait for domain entities.
pub trait Unique<T = Self> {
    fn id(&self) -> ID<T>;
}

use std::cmp::Ordering;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;

/// Namespace for deterministic (v5) event identifiers.
const EVENT_NAMESPACE: uuid::Uuid = uuid::Uuid::from_u128(0x6b2d9c41e0834f7ab55f1d2087ce3a19);

/// Generic ID wrapper providing compile-time type safety over uuid::Uuid.
pub struct ID<T> {
    inner: uuid::Uuid,
    marker: PhantomData<T>,
}

impl<T> ID<T> {
    pub fn inner(&self) -> uuid::Uuid {
        self.inner
    }
    /// Cast ID<T> to ID<U> while preserving the underlying UUID.
    pub fn cast<U>(self) -> ID<U> {
        ID {
            inner: self.inner,
            marker: PhantomData,
        }
    }
    /// Deterministic ID derived from a name. Equal names yield equal IDs,
    /// which is what makes client retries idempotent.
    pub fn derived(name: &str) -> Self {
        Self {
            inner: uuid::Uuid::new_v5(&EVENT_NAMESPACE, name.as_bytes()),
            marker: PhantomData,
        }
    }
    pub fn parse(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(Self::from)
    }
}

impl<T> From<ID<T>> for uuid::Uuid {
    fn from(id: ID<T>) -> Self {
        id.inner()
    }
}
impl<T> From<uuid::Uuid> for ID<T> {
    fn from(inner: uuid::Uuid) -> Self {
        Self {
            inner,
            marker: PhantomData,
        }
    }
}

impl<T> Default for ID<T> {
    fn default() -> Self {
        Self {
            inner: uuid::Uuid::now_v7(),
            marker: PhantomData,
        }
    }
}

impl<T> Copy for ID<T> {}
impl<T> Clone for ID<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Eq for ID<T> {}
impl<T> PartialEq for ID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Ord for ID<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<T> PartialOrd for ID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Hash for ID<T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.inner.hash(state);
    }
}

impl<T> Debug for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ID").field(&self.inner).finish()
    }
}
impl<T> Display for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl<T> serde::Serialize for ID<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.inner.serialize(serializer)
    }
}
impl<'de, T> serde::Deserialize<'de> for ID<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        uuid::Uuid::deserialize(deserializer).map(Self::from)
    }
}

impl<T> Arbitrary for ID<T> {
    fn random() -> Self {
        Self::default()
    }
}

// ============================================================================
// KNOBS
// Compiled defaults, overridable through the environment at process start.
// ============================================================================
/// Per-turn deadline in the async 1v1 variant (seconds).
pub const TURN_DEADLINE_DUEL_SECS: u64 = 86_400;
/// Per-turn deadline in the live variant (seconds).
pub const TURN_DEADLINE_LIVE_SECS: u64 = 60;
/// Hard cap on total session age before the stall sweep forfeits it (seconds).
pub const GAME_HARD_CAP_SECS: u64 = 604_800;
/// Window for a disconnected live player to return before forfeit (seconds).
pub const RECONNECT_WINDOW_SECS: u64 = 120;
/// Longest accepted clip (milliseconds).
pub const MAX_VIDEO_DURATION_MS: Millis = 15_000;
/// Longest accepted trick description (characters).
pub const MAX_TRICK_DESCRIPTION: usize = 500;
/// Bounded per-session idempotency history.
pub const MAX_PROCESSED_EVENTS: usize = 100;
/// Warn the current-turn player when the deadline is within this window (seconds).
pub const DEADLINE_WARNING_WINDOW_SECS: u64 = 3_600;
/// Minimum spacing between deadline warnings for one session (seconds).
pub const DEADLINE_WARNING_COOLDOWN_SECS: u64 = 1_800;
/// Operation-level timeout on socket-handler gateway calls (seconds).
pub const OP_TIMEOUT_SECS: u64 = 5;
/// Presence rows older than this demote to offline (seconds).
pub const PRESENCE_TTL_SECS: u64 = 300;

pub(crate) fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Limits threaded through the pure engines so tests can pin them.
#[derive(Debug, Clone, Copy)]
pub struct Knobs {
    pub turn_deadline: std::time::Duration,
    pub hard_cap: std::time::Duration,
    pub reconnect_window: std::time::Duration,
    pub video_cap_ms: Millis,
    pub dedup_cap: usize,
}

impl Knobs {
    /// Async 1v1 variant limits, environment-overridable.
    pub fn duel() -> Self {
        Self {
            turn_deadline: std::time::Duration::from_secs(env_u64(
                "TURN_DEADLINE_SECS",
                TURN_DEADLINE_DUEL_SECS,
            )),
            ..Self::default()
        }
    }
    /// Live multi-player variant limits, environment-overridable.
    pub fn live() -> Self {
        Self {
            turn_deadline: std::time::Duration::from_secs(env_u64(
                "LIVE_TURN_DEADLINE_SECS",
                TURN_DEADLINE_LIVE_SECS,
            )),
            ..Self::default()
        }
    }
}

impl Default for Knobs {
    fn default() -> Self {
        Self {
            turn_deadline: std::time::Duration::from_secs(TURN_DEADLINE_DUEL_SECS),
            hard_cap: std::time::Duration::from_secs(env_u64(
                "GAME_HARD_CAP_SECS",
                GAME_HARD_CAP_SECS,
            )),
            reconnect_window: std::time::Duration::from_secs(env_u64(
                "RECONNECT_WINDOW_SECS",
                RECONNECT_WINDOW_SECS,
            )),
            video_cap_ms: env_u64("MAX_VIDEO_DURATION_MS", MAX_VIDEO_DURATION_MS as u64) as Millis,
            dedup_cap: env_u64("MAX_PROCESSED_EVENTS", MAX_PROCESSED_EVENTS as u64) as usize,
        }
    }
}

/// Trusted storage host that clip URLs must reference.
pub fn video_host() -> String {
    std::env::var("VIDEO_HOST").unwrap_or_else(|_| String::from("media.skateduel.app"))
}

/// Shared secret the external scheduler must present on cron endpoints.
#[cfg(feature = "server")]
pub fn cron_secret() -> Option<String> {
    std::env::var("CRON_SECRET").ok()
}

/// Initialize dual logging (terminal + file) with timestamped log files.
#[cfg(feature = "server")]
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}

/// Register Ctrl+C handler for immediate termination.
#[cfg(feature = "server")]
pub fn kys() {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.unwrap();
        println!();
        log::warn!("violent interrupt received, exiting immediately");
        std::process::exit(0);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    struct Marker;

    #[test]
    fn derived_ids_are_stable() {
        let a = ID::<Marker>::derived("judge:g1:p2:7");
        let b = ID::<Marker>::derived("judge:g1:p2:7");
        assert_eq!(a, b);
    }
    #[test]
    fn derived_ids_differ_by_name() {
        let a = ID::<Marker>::derived("judge:g1:p2:7");
        let b = ID::<Marker>::derived("judge:g1:p2:8");
        assert_ne!(a, b);
    }
    #[test]
    fn fresh_ids_are_unique() {
        assert_ne!(ID::<Marker>::default(), ID::<Marker>::default());
    }
}
