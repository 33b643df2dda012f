use super::Game;
use super::PlayerId;
use super::Turn;
use crate::ID;
use crate::rules::Judgment;
use crate::rules::Verdict;
use std::time::SystemTime;

/// Single-use appeal of a BAIL call. Created once per (session, disputer),
/// resolved once by the judger; an upheld dispute reverses the letter and
/// swaps roles LAND-style.
#[derive(Debug, Clone)]
pub struct Dispute {
    id: i64,
    game: ID<Game>,
    turn: ID<Turn>,
    disputed_by: PlayerId,
    against: PlayerId,
    original: Judgment,
    resolution: Option<Verdict>,
    resolved_by: Option<PlayerId>,
    resolved_at: Option<SystemTime>,
    penalty_to: Option<PlayerId>,
    created_at: SystemTime,
}

impl Dispute {
    /// Open a dispute. `against` is the judger who called the BAIL and is
    /// the only one who may resolve it. The row id is sequence-assigned at
    /// insert; 0 marks a not-yet-persisted dispute.
    pub fn open(
        game: ID<Game>,
        turn: ID<Turn>,
        disputed_by: PlayerId,
        against: PlayerId,
        created_at: SystemTime,
    ) -> Self {
        Self {
            id: 0,
            game,
            turn,
            disputed_by,
            against,
            original: Judgment::Missed,
            resolution: None,
            resolved_by: None,
            resolved_at: None,
            penalty_to: None,
            created_at,
        }
    }
    pub fn id(&self) -> i64 {
        self.id
    }
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }
    pub fn game(&self) -> ID<Game> {
        self.game
    }
    pub fn turn(&self) -> ID<Turn> {
        self.turn
    }
    pub fn disputed_by(&self) -> PlayerId {
        self.disputed_by
    }
    pub fn against(&self) -> PlayerId {
        self.against
    }
    pub fn original(&self) -> Judgment {
        self.original
    }
    pub fn resolution(&self) -> Option<Verdict> {
        self.resolution
    }
    pub fn resolved_by(&self) -> Option<PlayerId> {
        self.resolved_by
    }
    pub fn resolved_at(&self) -> Option<SystemTime> {
        self.resolved_at
    }
    pub fn penalty_to(&self) -> Option<PlayerId> {
        self.penalty_to
    }
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }
    pub fn resolved(&self) -> bool {
        self.resolution.is_some()
    }
    /// Close the dispute. `landed` upholds it (the penalty lands on the
    /// judger); `missed` denies it (the penalty lands on the disputer).
    pub fn resolve(&mut self, verdict: Verdict, by: PlayerId, at: SystemTime) {
        self.resolution = Some(verdict);
        self.resolved_by = Some(by);
        self.resolved_at = Some(at);
        self.penalty_to = Some(match verdict {
            Verdict::Landed => self.against,
            Verdict::Missed => self.disputed_by,
        });
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use crate::pg::*;

    impl Schema for Dispute {
        fn name() -> &'static str {
            DISPUTES
        }
        fn columns() -> &'static [tokio_postgres::types::Type] {
            &[
                tokio_postgres::types::Type::INT8,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::TIMESTAMPTZ,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::TIMESTAMPTZ,
            ]
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                DISPUTES,
                " (
                    id                  BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                    game_id             UUID NOT NULL REFERENCES ",
                GAMES,
                "(id),
                    turn_id             UUID NOT NULL REFERENCES ",
                TURNS,
                "(id),
                    disputed_by         UUID NOT NULL,
                    against_player_id   UUID NOT NULL,
                    original_result     TEXT NOT NULL,
                    final_result        TEXT,
                    resolved_by         UUID,
                    resolved_at         TIMESTAMPTZ,
                    penalty_applied_to  UUID,
                    created_at          TIMESTAMPTZ NOT NULL,
                    UNIQUE (game_id, disputed_by)
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_disputes_game ON ",
                DISPUTES,
                " (game_id);"
            )
        }
    }

    impl Dispute {
        /// Hydrate from a row selected in `creates` column order.
        pub(crate) fn load(row: &tokio_postgres::Row) -> Result<Self, crate::duel::Reject> {
            Ok(Self {
                id: row.get(0),
                game: ID::from(row.get::<_, uuid::Uuid>(1)),
                turn: ID::from(row.get::<_, uuid::Uuid>(2)),
                disputed_by: ID::from(row.get::<_, uuid::Uuid>(3)),
                against: ID::from(row.get::<_, uuid::Uuid>(4)),
                original: Judgment::try_from(row.get::<_, &str>(5))
                    .map_err(crate::duel::Reject::Internal)?,
                resolution: row
                    .get::<_, Option<&str>>(6)
                    .map(Verdict::try_from)
                    .transpose()
                    .map_err(crate::duel::Reject::Internal)?,
                resolved_by: row.get::<_, Option<uuid::Uuid>>(7).map(ID::from),
                resolved_at: row.get(8),
                penalty_to: row.get::<_, Option<uuid::Uuid>>(9).map(ID::from),
                created_at: row.get(10),
            })
        }
    }
}
