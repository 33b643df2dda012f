use super::Dedup;
use super::PlayerId;
use crate::ID;
use crate::Unique;
use crate::rules::*;
use std::time::Duration;
use std::time::SystemTime;

/// One player's half of the session: identity, cached display name,
/// letter board, and the single-use dispute flag.
#[derive(Debug, Clone)]
pub struct Seat {
    pub player: PlayerId,
    pub name: String,
    pub letters: Letters,
    pub dispute_used: bool,
}

impl Seat {
    fn new(player: PlayerId, name: String) -> Self {
        Self {
            player,
            name,
            letters: Letters::NONE,
            dispute_used: false,
        }
    }
}

/// Cache of the most recently set trick, denormalized for list views.
#[derive(Debug, Clone)]
pub struct LastTrick {
    pub description: String,
    pub by: PlayerId,
}

/// An async 1v1 duel session. The single unit of transactional
/// concurrency: every mutation re-reads and rewrites this row under an
/// exclusive lock.
#[derive(Debug, Clone)]
pub struct Game {
    id: ID<Self>,
    seats: [Seat; 2],
    phase: Phase,
    turn_phase: Option<TurnPhase>,
    current_turn: Option<PlayerId>,
    offensive: PlayerId,
    defensive: PlayerId,
    last_trick: Option<LastTrick>,
    deadline_at: Option<SystemTime>,
    warned_at: Option<SystemTime>,
    completed_at: Option<SystemTime>,
    winner: Option<PlayerId>,
    processed: Dedup,
    created_at: SystemTime,
    updated_at: SystemTime,
}

impl Game {
    /// Seed a challenge: pending phase, challenger on offense, clock not
    /// yet running.
    pub fn challenge(
        id: ID<Self>,
        challenger: PlayerId,
        challenger_name: String,
        opponent: PlayerId,
        opponent_name: String,
        now: SystemTime,
    ) -> Self {
        Self {
            id,
            seats: [
                Seat::new(challenger, challenger_name),
                Seat::new(opponent, opponent_name),
            ],
            phase: Phase::Pending,
            turn_phase: Some(TurnPhase::SetTrick),
            current_turn: Some(challenger),
            offensive: challenger,
            defensive: opponent,
            last_trick: None,
            deadline_at: None,
            warned_at: None,
            completed_at: None,
            winner: None,
            processed: Dedup::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

// lookups
impl Game {
    pub fn player1(&self) -> &Seat {
        &self.seats[0]
    }
    pub fn player2(&self) -> &Seat {
        &self.seats[1]
    }
    pub fn seat(&self, player: PlayerId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.player == player)
    }
    fn seat_mut(&mut self, player: PlayerId) -> &mut Seat {
        self.seats
            .iter_mut()
            .find(|s| s.player == player)
            .expect("player has a seat")
    }
    pub fn is_player(&self, player: PlayerId) -> bool {
        self.seat(player).is_some()
    }
    pub fn opponent_of(&self, player: PlayerId) -> PlayerId {
        match self.seats[0].player == player {
            true => self.seats[1].player,
            false => self.seats[0].player,
        }
    }
    pub fn name_of(&self, player: PlayerId) -> &str {
        self.seat(player).map(|s| s.name.as_str()).unwrap_or("?")
    }
    pub fn roles(&self) -> Roles<PlayerId> {
        Roles::new(self.offensive, self.defensive)
    }
    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn turn_phase(&self) -> Option<TurnPhase> {
        self.turn_phase
    }
    pub fn current_turn(&self) -> Option<PlayerId> {
        self.current_turn
    }
    pub fn offensive(&self) -> PlayerId {
        self.offensive
    }
    pub fn defensive(&self) -> PlayerId {
        self.defensive
    }
    pub fn last_trick(&self) -> Option<&LastTrick> {
        self.last_trick.as_ref()
    }
    pub fn deadline_at(&self) -> Option<SystemTime> {
        self.deadline_at
    }
    pub fn warned_at(&self) -> Option<SystemTime> {
        self.warned_at
    }
    pub fn completed_at(&self) -> Option<SystemTime> {
        self.completed_at
    }
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
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
    /// The player whose board filled up, if any.
    pub fn eliminated(&self) -> Option<PlayerId> {
        self.seats
            .iter()
            .find(|s| s.letters.eliminated())
            .map(|s| s.player)
    }
    /// Loser under the hard cap: most letters, ties broken by the
    /// current-turn pointer, then player1.
    pub fn stalled_loser(&self) -> PlayerId {
        use std::cmp::Ordering;
        match self.seats[0].letters.cmp(&self.seats[1].letters) {
            Ordering::Greater => self.seats[0].player,
            Ordering::Less => self.seats[1].player,
            Ordering::Equal => self.current_turn.unwrap_or(self.seats[0].player),
        }
    }
    pub fn expired(&self, now: SystemTime) -> bool {
        self.deadline_at.map(|d| d < now).unwrap_or(false)
    }
}

// transitions, called by the engine once validation has passed
impl Game {
    /// Challenge accepted: game goes live, challenger is on the clock.
    pub fn accept(&mut self, now: SystemTime, deadline: Duration) {
        self.phase = Phase::Active;
        self.open_round(now, deadline);
    }
    /// Challenge declined: terminal with no winner and no letters.
    pub fn decline(&mut self, now: SystemTime) {
        self.phase = Phase::Declined;
        self.turn_phase = None;
        self.current_turn = None;
        self.deadline_at = None;
        self.completed_at = Some(now);
        self.updated_at = now;
    }
    /// Set trick recorded: defense is on the clock to respond.
    pub fn begin_respond(&mut self, trick: LastTrick, now: SystemTime, deadline: Duration) {
        self.last_trick = Some(trick);
        self.turn_phase = Some(TurnPhase::RespondTrick);
        self.current_turn = Some(self.defensive);
        self.push_deadline(now, deadline);
        self.updated_at = now;
    }
    /// Response recorded: same player judges their own attempt.
    pub fn begin_judge(&mut self, now: SystemTime, deadline: Duration) {
        self.turn_phase = Some(TurnPhase::Judge);
        self.current_turn = Some(self.defensive);
        self.push_deadline(now, deadline);
        self.updated_at = now;
    }
    /// Apply a round close: letter accretion plus whatever role layout the
    /// rules produced. Does not open the next round or finish the game.
    pub fn apply_close(&mut self, close: RoundClose<PlayerId>) {
        if let Some(player) = close.letter_to {
            let seat = self.seat_mut(player);
            seat.letters = seat.letters.gain();
        }
        self.offensive = close.roles.offensive;
        self.defensive = close.roles.defensive;
    }
    /// Reverse a BAIL letter on an upheld dispute.
    pub fn pardon(&mut self, player: PlayerId) {
        let seat = self.seat_mut(player);
        seat.letters = seat.letters.strip();
    }
    pub fn use_dispute(&mut self, player: PlayerId) {
        self.seat_mut(player).dispute_used = true;
    }
    /// Start the next round: offense sets, clock restarts.
    pub fn open_round(&mut self, now: SystemTime, deadline: Duration) {
        self.turn_phase = Some(TurnPhase::SetTrick);
        self.current_turn = Some(self.offensive);
        self.push_deadline(now, deadline);
        self.updated_at = now;
    }
    /// Terminal transition. Clears the clock, the sub-phase and the turn
    /// pointer; records the winner and completion time.
    pub fn finish(&mut self, phase: Phase, winner: Option<PlayerId>, now: SystemTime) {
        debug_assert!(phase.terminal());
        self.phase = phase;
        self.winner = winner;
        self.turn_phase = None;
        self.current_turn = None;
        self.deadline_at = None;
        self.completed_at = Some(now);
        self.updated_at = now;
    }
    pub fn record_warning(&mut self, now: SystemTime) {
        self.warned_at = Some(now);
        self.updated_at = now;
    }
    fn push_deadline(&mut self, now: SystemTime, deadline: Duration) {
        self.deadline_at = Some(now + deadline);
        self.warned_at = None;
    }
}

impl Unique for Game {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use crate::pg::*;

    impl Schema for Game {
        fn name() -> &'static str {
            GAMES
        }
        fn columns() -> &'static [tokio_postgres::types::Type] {
            &[
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::VARCHAR,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::VARCHAR,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::TIMESTAMPTZ,
                tokio_postgres::types::Type::TIMESTAMPTZ,
                tokio_postgres::types::Type::TIMESTAMPTZ,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::BOOL,
                tokio_postgres::types::Type::BOOL,
                tokio_postgres::types::Type::UUID_ARRAY,
                tokio_postgres::types::Type::TIMESTAMPTZ,
                tokio_postgres::types::Type::TIMESTAMPTZ,
            ]
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                GAMES,
                " (
                    id                      UUID PRIMARY KEY,
                    player1_id              UUID NOT NULL,
                    player1_name            VARCHAR(32) NOT NULL,
                    player2_id              UUID NOT NULL,
                    player2_name            VARCHAR(32) NOT NULL,
                    status                  TEXT NOT NULL,
                    turn_phase              TEXT,
                    current_turn            UUID,
                    offensive_id            UUID NOT NULL,
                    defensive_id            UUID NOT NULL,
                    player1_letters         TEXT NOT NULL DEFAULT '',
                    player2_letters         TEXT NOT NULL DEFAULT '',
                    last_trick_description  TEXT,
                    last_trick_by           UUID,
                    deadline_at             TIMESTAMPTZ,
                    warned_at               TIMESTAMPTZ,
                    completed_at            TIMESTAMPTZ,
                    winner_id               UUID,
                    player1_dispute_used    BOOLEAN NOT NULL DEFAULT FALSE,
                    player2_dispute_used    BOOLEAN NOT NULL DEFAULT FALSE,
                    processed_events        UUID[] NOT NULL DEFAULT '{}',
                    created_at              TIMESTAMPTZ NOT NULL,
                    updated_at              TIMESTAMPTZ NOT NULL
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_games_status_deadline ON ",
                GAMES,
                " (status, deadline_at);
                 CREATE INDEX IF NOT EXISTS idx_games_player1 ON ",
                GAMES,
                " (player1_id);
                 CREATE INDEX IF NOT EXISTS idx_games_player2 ON ",
                GAMES,
                " (player2_id);"
            )
        }
    }

    impl Game {
        /// Hydrate from a row selected in `creates` column order.
        pub(crate) fn load(row: &tokio_postgres::Row) -> Result<Self, crate::duel::Reject> {
            let mut seats = [
                Seat::new(ID::from(row.get::<_, uuid::Uuid>(1)), row.get(2)),
                Seat::new(ID::from(row.get::<_, uuid::Uuid>(3)), row.get(4)),
            ];
            seats[0].letters = Letters::try_from(row.get::<_, &str>(10))
                .map_err(crate::duel::Reject::Internal)?;
            seats[1].letters = Letters::try_from(row.get::<_, &str>(11))
                .map_err(crate::duel::Reject::Internal)?;
            seats[0].dispute_used = row.get(18);
            seats[1].dispute_used = row.get(19);
            Ok(Self {
                id: ID::from(row.get::<_, uuid::Uuid>(0)),
                seats,
                phase: Phase::try_from(row.get::<_, &str>(5))
                    .map_err(crate::duel::Reject::Internal)?,
                turn_phase: row
                    .get::<_, Option<&str>>(6)
                    .map(TurnPhase::try_from)
                    .transpose()
                    .map_err(crate::duel::Reject::Internal)?,
                current_turn: row.get::<_, Option<uuid::Uuid>>(7).map(ID::from),
                offensive: ID::from(row.get::<_, uuid::Uuid>(8)),
                defensive: ID::from(row.get::<_, uuid::Uuid>(9)),
                last_trick: match (
                    row.get::<_, Option<String>>(12),
                    row.get::<_, Option<uuid::Uuid>>(13),
                ) {
                    (Some(description), Some(by)) => Some(LastTrick {
                        description,
                        by: ID::from(by),
                    }),
                    _ => None,
                },
                deadline_at: row.get(14),
                warned_at: row.get(15),
                completed_at: row.get(16),
                winner: row.get::<_, Option<uuid::Uuid>>(17).map(ID::from),
                processed: Dedup::from(row.get::<_, Vec<uuid::Uuid>>(20)),
                created_at: row.get(21),
                updated_at: row.get(22),
            })
        }
    }
}
