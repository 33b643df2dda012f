use super::protocol::ServerMessage;
use crate::ID;
use crate::Unique;
use crate::duel::Dedup;
use crate::duel::PlayerId;
use crate::rules::Letters;
use crate::rules::rotation;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Live session lifecycle. `Waiting` collects players before the first
/// round; `Paused` means someone dropped and the reconnect window is open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
    Waiting,
    Active,
    Paused,
    Completed,
    Forfeited,
}

impl LiveStatus {
    pub fn terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Forfeited)
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Forfeited => "forfeited",
        }
    }
}

impl TryFrom<&str> for LiveStatus {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "forfeited" => Ok(Self::Forfeited),
            other => Err(format!("unknown live status: {}", other)),
        }
    }
}

/// What the session is waiting on inside an active round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveAction {
    /// Setter records the trick to beat.
    SetTrick,
    /// Non-setters take their one attempt, in slot order.
    Attempt,
}

impl LiveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetTrick => "set_trick",
            Self::Attempt => "attempt",
        }
    }
}

impl TryFrom<&str> for LiveAction {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "set_trick" => Ok(Self::SetTrick),
            "attempt" => Ok(Self::Attempt),
            other => Err(format!("unknown live action: {}", other)),
        }
    }
}

/// One ordered player slot, JSON-persisted on the session row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub player: PlayerId,
    pub name: String,
    #[serde(default)]
    pub letters: Letters,
    #[serde(default = "yes")]
    pub connected: bool,
    /// Epoch millis of the disconnect, when disconnected.
    #[serde(default)]
    pub disconnected_at: Option<u64>,
    #[serde(default)]
    pub forfeited: bool,
}

fn yes() -> bool {
    true
}

impl Slot {
    pub fn new(player: PlayerId, name: String) -> Self {
        Self {
            player,
            name,
            letters: Letters::NONE,
            connected: true,
            disconnected_at: None,
            forfeited: false,
        }
    }
    /// Out of the running: board full or forfeited out.
    pub fn out(&self) -> bool {
        self.letters.eliminated() || self.forfeited
    }
    pub fn disconnected_since(&self) -> Option<SystemTime> {
        self.disconnected_at
            .map(|ms| UNIX_EPOCH + Duration::from_millis(ms))
    }
}

/// A live multi-player session. Same transactional discipline as the duel
/// row: one lock, one idempotency log, all mutations through the gateway.
#[derive(Debug, Clone)]
pub struct LiveSession {
    id: ID<Self>,
    spot: String,
    creator: PlayerId,
    slots: Vec<Slot>,
    max_players: usize,
    status: LiveStatus,
    action: Option<LiveAction>,
    /// Slot index of whoever must act next.
    cursor: usize,
    /// Slot index of the current round's setter.
    setter: usize,
    current_trick: Option<String>,
    winner: Option<PlayerId>,
    deadline_at: Option<SystemTime>,
    paused_at: Option<SystemTime>,
    processed: Dedup,
    created_at: SystemTime,
    updated_at: SystemTime,
}

impl LiveSession {
    pub fn open(
        id: ID<Self>,
        spot: String,
        creator: PlayerId,
        creator_name: String,
        max_players: usize,
        now: SystemTime,
    ) -> Self {
        Self {
            id,
            spot,
            creator,
            slots: vec![Slot::new(creator, creator_name)],
            max_players,
            status: LiveStatus::Waiting,
            action: None,
            cursor: 0,
            setter: 0,
            current_trick: None,
            winner: None,
            deadline_at: None,
            paused_at: None,
            processed: Dedup::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

// lookups
impl LiveSession {
    pub fn spot(&self) -> &str {
        &self.spot
    }
    pub fn creator(&self) -> PlayerId {
        self.creator
    }
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
    pub fn max_players(&self) -> usize {
        self.max_players
    }
    pub fn status(&self) -> LiveStatus {
        self.status
    }
    pub fn action(&self) -> Option<LiveAction> {
        self.action
    }
    pub fn cursor(&self) -> usize {
        self.cursor
    }
    pub fn setter(&self) -> usize {
        self.setter
    }
    pub fn current_trick(&self) -> Option<&str> {
        self.current_trick.as_deref()
    }
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }
    pub fn deadline_at(&self) -> Option<SystemTime> {
        self.deadline_at
    }
    pub fn paused_at(&self) -> Option<SystemTime> {
        self.paused_at
    }
    pub fn processed(&self) -> &Dedup {
        &self.processed
    }
    pub fn processed_mut(&mut self) -> &mut Dedup {
        &mut self.processed
    }
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }
    pub fn updated_at(&self) -> SystemTime {
        self.updated_at
    }
    pub fn slot_of(&self, player: PlayerId) -> Option<usize> {
        self.slots.iter().position(|s| s.player == player)
    }
    pub fn is_player(&self, player: PlayerId) -> bool {
        self.slot_of(player).is_some()
    }
    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.max_players
    }
    pub fn current_player(&self) -> Option<PlayerId> {
        match self.status {
            LiveStatus::Active => self.slots.get(self.cursor).map(|s| s.player),
            _ => None,
        }
    }
    pub fn outs(&self) -> Vec<bool> {
        self.slots.iter().map(Slot::out).collect()
    }
    pub fn expired(&self, now: SystemTime) -> bool {
        self.deadline_at.map(|d| d < now).unwrap_or(false)
    }
    pub fn any_disconnected(&self) -> bool {
        self.slots.iter().any(|s| !s.out() && !s.connected)
    }
    /// Closest to winning among players still in the running: fewest
    /// letters, slot order breaking ties. The forfeiting slot is excluded;
    /// None when nobody else is left standing.
    pub fn closest_to_winning(&self, excluding: usize) -> Option<PlayerId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(i, slot)| *i != excluding && !slot.out())
            .min_by_key(|(i, slot)| (slot.letters, *i))
            .map(|(_, slot)| slot.player)
    }
}

// transitions, called by the engine once validation has passed
impl LiveSession {
    pub fn seat(&mut self, slot: Slot, now: SystemTime) {
        self.slots.push(slot);
        self.updated_at = now;
    }
    /// First round: the creator sets.
    pub fn start(&mut self, now: SystemTime, deadline: Duration) {
        self.status = LiveStatus::Active;
        self.action = Some(LiveAction::SetTrick);
        self.setter = 0;
        self.cursor = 0;
        self.push_deadline(now, deadline);
        self.updated_at = now;
    }
    pub fn set_trick(&mut self, trick: String, now: SystemTime, deadline: Duration) {
        self.current_trick = Some(trick);
        self.action = Some(LiveAction::Attempt);
        self.push_deadline(now, deadline);
        self.updated_at = now;
    }
    /// Move the cursor; when it wraps to the setter the round closes and
    /// the next survivor after the setter sets.
    pub fn advance(&mut self, now: SystemTime, deadline: Duration) {
        let outs = self.outs();
        match rotation::next_active(&outs, self.cursor) {
            Some(next) if next != self.setter => {
                self.cursor = next;
                self.push_deadline(now, deadline);
                self.updated_at = now;
            }
            _ => {
                // wrapped (or nobody left to attempt): new round
                let setter = rotation::next_active(&outs, self.setter).unwrap_or(self.setter);
                self.new_round(setter, now, deadline);
            }
        }
    }
    /// Open a fresh round with the given setter.
    pub fn new_round(&mut self, setter: usize, now: SystemTime, deadline: Duration) {
        self.setter = setter;
        self.cursor = setter;
        self.action = Some(LiveAction::SetTrick);
        self.current_trick = None;
        self.push_deadline(now, deadline);
        self.updated_at = now;
    }
    pub fn give_letter(&mut self, index: usize, now: SystemTime) -> Letters {
        let slot = &mut self.slots[index];
        slot.letters = slot.letters.gain();
        self.updated_at = now;
        slot.letters
    }
    pub fn forfeit_slot(&mut self, index: usize, now: SystemTime) {
        self.slots[index].forfeited = true;
        self.updated_at = now;
    }
    pub fn mark_disconnected(&mut self, index: usize, now: SystemTime) {
        let slot = &mut self.slots[index];
        slot.connected = false;
        slot.disconnected_at = Some(epoch_millis(now));
        self.updated_at = now;
    }
    pub fn mark_connected(&mut self, index: usize, now: SystemTime) {
        let slot = &mut self.slots[index];
        slot.connected = true;
        slot.disconnected_at = None;
        self.updated_at = now;
    }
    pub fn pause(&mut self, now: SystemTime) {
        self.status = LiveStatus::Paused;
        self.paused_at = Some(now);
        self.updated_at = now;
    }
    pub fn resume(&mut self, now: SystemTime, deadline: Duration) {
        self.status = LiveStatus::Active;
        self.paused_at = None;
        self.push_deadline(now, deadline);
        self.updated_at = now;
    }
    pub fn finish(&mut self, status: LiveStatus, winner: Option<PlayerId>, now: SystemTime) {
        debug_assert!(status.terminal());
        self.status = status;
        self.winner = winner;
        self.action = None;
        self.current_trick = None;
        self.deadline_at = None;
        self.paused_at = None;
        self.updated_at = now;
    }
    fn push_deadline(&mut self, now: SystemTime, deadline: Duration) {
        self.deadline_at = Some(now + deadline);
    }
}

// wire snapshots
impl LiveSession {
    /// Full state for (re)joining clients.
    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::state(self)
    }
    pub fn turn_message(&self, time_limit: Duration) -> ServerMessage {
        ServerMessage::turn(
            self.id,
            self.current_player(),
            self.action.map(|a| a.as_str()).unwrap_or("waiting"),
            time_limit.as_secs(),
        )
    }
}

fn epoch_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

impl Unique for LiveSession {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use crate::pg::*;

    impl Schema for LiveSession {
        fn name() -> &'static str {
            SESSIONS
        }
        fn columns() -> &'static [tokio_postgres::types::Type] {
            &[
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::JSONB,
                tokio_postgres::types::Type::INT4,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::INT4,
                tokio_postgres::types::Type::INT4,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::TIMESTAMPTZ,
                tokio_postgres::types::Type::TIMESTAMPTZ,
                tokio_postgres::types::Type::UUID_ARRAY,
                tokio_postgres::types::Type::TIMESTAMPTZ,
                tokio_postgres::types::Type::TIMESTAMPTZ,
            ]
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                SESSIONS,
                " (
                    id                  UUID PRIMARY KEY,
                    spot_id             TEXT NOT NULL,
                    creator_id          UUID NOT NULL,
                    players             JSONB NOT NULL,
                    max_players         INTEGER NOT NULL,
                    status              TEXT NOT NULL,
                    current_action      TEXT,
                    current_turn_index  INTEGER NOT NULL DEFAULT 0,
                    setter_index        INTEGER NOT NULL DEFAULT 0,
                    current_trick       TEXT,
                    winner_id           UUID,
                    turn_deadline_at    TIMESTAMPTZ,
                    paused_at           TIMESTAMPTZ,
                    processed_events    UUID[] NOT NULL DEFAULT '{}',
                    created_at          TIMESTAMPTZ NOT NULL,
                    updated_at          TIMESTAMPTZ NOT NULL
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_sessions_status_deadline ON ",
                SESSIONS,
                " (status, turn_deadline_at);
                 CREATE INDEX IF NOT EXISTS idx_sessions_spot ON ",
                SESSIONS,
                " (spot_id);"
            )
        }
    }

    impl LiveSession {
        /// Hydrate from a row selected in `creates` column order.
        pub(crate) fn load(row: &tokio_postgres::Row) -> Result<Self, crate::duel::Reject> {
            use crate::duel::Reject;
            let players: serde_json::Value = row.get(3);
            let slots: Vec<Slot> =
                serde_json::from_value(players).map_err(|e| Reject::Internal(e.to_string()))?;
            Ok(Self {
                id: ID::from(row.get::<_, uuid::Uuid>(0)),
                spot: row.get(1),
                creator: ID::from(row.get::<_, uuid::Uuid>(2)),
                slots,
                max_players: row.get::<_, i32>(4) as usize,
                status: LiveStatus::try_from(row.get::<_, &str>(5))
                    .map_err(Reject::Internal)?,
                action: row
                    .get::<_, Option<&str>>(6)
                    .map(LiveAction::try_from)
                    .transpose()
                    .map_err(Reject::Internal)?,
                cursor: row.get::<_, i32>(7) as usize,
                setter: row.get::<_, i32>(8) as usize,
                current_trick: row.get(9),
                winner: row.get::<_, Option<uuid::Uuid>>(10).map(ID::from),
                deadline_at: row.get(11),
                paused_at: row.get(12),
                processed: Dedup::from(row.get::<_, Vec<uuid::Uuid>>(13)),
                created_at: row.get(14),
                updated_at: row.get(15),
            })
        }
        pub(crate) fn players_json(&self) -> serde_json::Value {
            serde_json::to_value(&self.slots).expect("serialize player slots")
        }
    }
}
