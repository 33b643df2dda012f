use super::Clip;
use super::Game;
use super::PlayerId;
use crate::ID;
use crate::TurnNumber;
use crate::Unique;
use crate::rules::Judgment;
use serde::Deserialize;
use serde::Serialize;
use std::time::SystemTime;

/// Whether a turn opens a round or answers one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Set,
    Response,
}

impl TurnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Response => "response",
        }
    }
}

impl TryFrom<&str> for TurnKind {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "set" => Ok(Self::Set),
            "response" => Ok(Self::Response),
            other => Err(format!("unknown turn kind: {}", other)),
        }
    }
}

/// One submitted video. Immutable after insert except for the judgment
/// fields, which mutate exactly once on the round's single `set` turn.
#[derive(Debug, Clone)]
pub struct Turn {
    id: ID<Self>,
    game: ID<Game>,
    player: PlayerId,
    player_name: String,
    number: TurnNumber,
    kind: TurnKind,
    clip: Clip,
    judgment: Judgment,
    judged_by: Option<PlayerId>,
    judged_at: Option<SystemTime>,
}

impl Turn {
    pub fn new(
        id: ID<Self>,
        game: ID<Game>,
        player: PlayerId,
        player_name: String,
        number: TurnNumber,
        kind: TurnKind,
        clip: Clip,
    ) -> Self {
        Self {
            id,
            game,
            player,
            player_name,
            number,
            kind,
            clip,
            judgment: Judgment::Pending,
            judged_by: None,
            judged_at: None,
        }
    }
    pub fn game(&self) -> ID<Game> {
        self.game
    }
    pub fn player(&self) -> PlayerId {
        self.player
    }
    pub fn player_name(&self) -> &str {
        &self.player_name
    }
    pub fn number(&self) -> TurnNumber {
        self.number
    }
    pub fn kind(&self) -> TurnKind {
        self.kind
    }
    pub fn clip(&self) -> &Clip {
        &self.clip
    }
    pub fn judgment(&self) -> Judgment {
        self.judgment
    }
    pub fn judged_by(&self) -> Option<PlayerId> {
        self.judged_by
    }
    pub fn judged_at(&self) -> Option<SystemTime> {
        self.judged_at
    }
    /// The single post-insert mutation a turn row ever sees.
    pub fn judge(&mut self, judgment: Judgment, by: PlayerId, at: SystemTime) {
        self.judgment = judgment;
        self.judged_by = Some(by);
        self.judged_at = Some(at);
    }
}

impl Unique for Turn {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use crate::pg::*;

    impl Schema for Turn {
        fn name() -> &'static str {
            TURNS
        }
        fn columns() -> &'static [tokio_postgres::types::Type] {
            &[
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::VARCHAR,
                tokio_postgres::types::Type::INT4,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::INT4,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::TEXT,
                tokio_postgres::types::Type::UUID,
                tokio_postgres::types::Type::TIMESTAMPTZ,
            ]
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                TURNS,
                " (
                    id                  UUID PRIMARY KEY,
                    game_id             UUID NOT NULL REFERENCES ",
                GAMES,
                "(id),
                    player_id           UUID NOT NULL,
                    player_name         VARCHAR(32) NOT NULL,
                    turn_number         INTEGER NOT NULL,
                    turn_type           TEXT NOT NULL,
                    trick_description   TEXT NOT NULL,
                    video_url           TEXT NOT NULL,
                    video_duration_ms   INTEGER NOT NULL,
                    thumbnail_url       TEXT,
                    result              TEXT NOT NULL DEFAULT 'pending',
                    judged_by           UUID,
                    judged_at           TIMESTAMPTZ,
                    UNIQUE (game_id, turn_number)
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_turns_game ON ",
                TURNS,
                " (game_id, turn_number);"
            )
        }
    }

    impl Turn {
        /// Hydrate from a row selected in `creates` column order.
        pub(crate) fn load(row: &tokio_postgres::Row) -> Result<Self, crate::duel::Reject> {
            Ok(Self {
                id: ID::from(row.get::<_, uuid::Uuid>(0)),
                game: ID::from(row.get::<_, uuid::Uuid>(1)),
                player: ID::from(row.get::<_, uuid::Uuid>(2)),
                player_name: row.get(3),
                number: row.get(4),
                kind: TurnKind::try_from(row.get::<_, &str>(5))
                    .map_err(crate::duel::Reject::Internal)?,
                clip: Clip {
                    description: row.get(6),
                    video_url: row.get(7),
                    duration_ms: row.get(8),
                    thumbnail_url: row.get(9),
                },
                judgment: Judgment::try_from(row.get::<_, &str>(10))
                    .map_err(crate::duel::Reject::Internal)?,
                judged_by: row.get::<_, Option<uuid::Uuid>>(11).map(ID::from),
                judged_at: row.get(12),
            })
        }
    }
}
