use crate::ID;
use crate::TurnNumber;
use crate::Unique;
use crate::duel::*;
use crate::live::LiveSession;
use crate::notify::Preferences;
use crate::pg::*;
use std::time::SystemTime;
use tokio_postgres::GenericClient;

/// Column lists in `Schema::creates` order; every SELECT uses these so the
/// positional `load` hydrators stay honest.
#[rustfmt::skip]
const GAME_COLS: &str =
    "id, player1_id, player1_name, player2_id, player2_name, status, turn_phase, \
     current_turn, offensive_id, defensive_id, player1_letters, player2_letters, \
     last_trick_description, last_trick_by, deadline_at, warned_at, completed_at, \
     winner_id, player1_dispute_used, player2_dispute_used, processed_events, \
     created_at, updated_at";
#[rustfmt::skip]
const TURN_COLS: &str =
    "id, game_id, player_id, player_name, turn_number, turn_type, trick_description, \
     video_url, video_duration_ms, thumbnail_url, result, judged_by, judged_at";
#[rustfmt::skip]
const DISPUTE_COLS: &str =
    "id, game_id, turn_id, disputed_by, against_player_id, original_result, \
     final_result, resolved_by, resolved_at, penalty_applied_to, created_at";
#[rustfmt::skip]
const SESSION_COLS: &str =
    "id, spot_id, creator_id, players, max_players, status, current_action, \
     current_turn_index, setter_index, current_trick, winner_id, turn_deadline_at, \
     paused_at, processed_events, created_at, updated_at";

/// SQL for every entity, implemented over both plain clients and open
/// transactions. Locking variants are only meaningful inside the latter.
#[allow(async_fn_in_trait)]
pub trait Repository {
    // duel sessions
    async fn lock_game(&self, id: ID<Game>) -> Result<Option<Game>, Reject>;
    async fn fetch_game(&self, id: ID<Game>) -> Result<Option<Game>, Reject>;
    async fn insert_game(&self, game: &Game) -> Result<(), Reject>;
    async fn update_game(&self, game: &Game) -> Result<(), Reject>;
    async fn games_of(&self, player: PlayerId) -> Result<Vec<Game>, Reject>;
    // turns
    async fn next_turn_number(&self, game: ID<Game>) -> Result<TurnNumber, Reject>;
    async fn insert_turn(&self, turn: &Turn) -> Result<(), Reject>;
    async fn lock_turn(&self, id: ID<Turn>) -> Result<Option<Turn>, Reject>;
    async fn fetch_turn(&self, id: ID<Turn>) -> Result<Option<Turn>, Reject>;
    async fn turns_of(&self, game: ID<Game>) -> Result<Vec<Turn>, Reject>;
    async fn response_after(&self, game: ID<Game>, number: TurnNumber) -> Result<bool, Reject>;
    async fn apply_judgment(&self, update: &JudgeUpdate) -> Result<(), Reject>;
    async fn game_of_turn(&self, turn: ID<Turn>) -> Result<Option<ID<Game>>, Reject>;
    // disputes
    async fn insert_dispute(&self, dispute: &Dispute) -> Result<i64, Reject>;
    async fn lock_dispute(&self, id: i64) -> Result<Option<Dispute>, Reject>;
    async fn disputes_of(&self, game: ID<Game>) -> Result<Vec<Dispute>, Reject>;
    async fn update_dispute(&self, dispute: &Dispute) -> Result<(), Reject>;
    async fn game_of_dispute(&self, id: i64) -> Result<Option<ID<Game>>, Reject>;
    // profiles
    async fn bump_penalty(&self, player: PlayerId) -> Result<(), Reject>;
    async fn fetch_profile(&self, id: PlayerId) -> Result<Option<Profile>, Reject>;
    async fn ensure_profile(&self, id: PlayerId, username: &str) -> Result<(), Reject>;
    // reconciler scans
    async fn expired_games(&self) -> Result<Vec<(ID<Game>, SystemTime)>, Reject>;
    async fn warnable_games(&self, window_secs: f64) -> Result<Vec<(ID<Game>, SystemTime)>, Reject>;
    async fn stalled_games(&self, cap_secs: f64) -> Result<Vec<(ID<Game>, SystemTime)>, Reject>;
    // live sessions
    async fn lock_session(&self, id: ID<LiveSession>) -> Result<Option<LiveSession>, Reject>;
    async fn fetch_session(&self, id: ID<LiveSession>) -> Result<Option<LiveSession>, Reject>;
    async fn insert_session(&self, session: &LiveSession) -> Result<(), Reject>;
    async fn update_session(&self, session: &LiveSession) -> Result<(), Reject>;
    async fn expired_sessions(&self) -> Result<Vec<(ID<LiveSession>, SystemTime)>, Reject>;
    async fn paused_sessions(&self) -> Result<Vec<LiveSession>, Reject>;
    async fn purge_sessions(&self, cap_secs: f64) -> Result<u64, Reject>;
}

impl<C: GenericClient + Sync> Repository for C {
    async fn lock_game(&self, id: ID<Game>) -> Result<Option<Game>, Reject> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ", GAME_COLS, " FROM ", GAMES, " WHERE id = $1 FOR UPDATE"
            ),
            &[&id.inner()],
        )
        .await?
        .map(|row| Game::load(&row))
        .transpose()
    }

    async fn fetch_game(&self, id: ID<Game>) -> Result<Option<Game>, Reject> {
        self.query_opt(
            const_format::concatcp!("SELECT ", GAME_COLS, " FROM ", GAMES, " WHERE id = $1"),
            &[&id.inner()],
        )
        .await?
        .map(|row| Game::load(&row))
        .transpose()
    }

    async fn insert_game(&self, game: &Game) -> Result<(), Reject> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                GAMES,
                " (",
                GAME_COLS,
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
                   $15, $16, $17, $18, $19, $20, $21, $22, $23)"
            ),
            &[
                &game.id().inner(),
                &game.player1().player.inner(),
                &game.player1().name,
                &game.player2().player.inner(),
                &game.player2().name,
                &game.phase().as_str(),
                &game.turn_phase().map(|p| p.as_str()),
                &game.current_turn().map(|p| p.inner()),
                &game.offensive().inner(),
                &game.defensive().inner(),
                &game.player1().letters.as_str(),
                &game.player2().letters.as_str(),
                &game.last_trick().map(|t| t.description.clone()),
                &game.last_trick().map(|t| t.by.inner()),
                &game.deadline_at(),
                &game.warned_at(),
                &game.completed_at(),
                &game.winner().map(|p| p.inner()),
                &game.player1().dispute_used,
                &game.player2().dispute_used,
                &game.processed().raw(),
                &game.created_at(),
                &game.updated_at(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn update_game(&self, game: &Game) -> Result<(), Reject> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                GAMES,
                " SET status = $2, turn_phase = $3, current_turn = $4, offensive_id = $5, \
                   defensive_id = $6, player1_letters = $7, player2_letters = $8, \
                   last_trick_description = $9, last_trick_by = $10, deadline_at = $11, \
                   warned_at = $12, completed_at = $13, winner_id = $14, \
                   player1_dispute_used = $15, player2_dispute_used = $16, \
                   processed_events = $17, updated_at = $18
                 WHERE id = $1"
            ),
            &[
                &game.id().inner(),
                &game.phase().as_str(),
                &game.turn_phase().map(|p| p.as_str()),
                &game.current_turn().map(|p| p.inner()),
                &game.offensive().inner(),
                &game.defensive().inner(),
                &game.player1().letters.as_str(),
                &game.player2().letters.as_str(),
                &game.last_trick().map(|t| t.description.clone()),
                &game.last_trick().map(|t| t.by.inner()),
                &game.deadline_at(),
                &game.warned_at(),
                &game.completed_at(),
                &game.winner().map(|p| p.inner()),
                &game.player1().dispute_used,
                &game.player2().dispute_used,
                &game.processed().raw(),
                &game.updated_at(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn games_of(&self, player: PlayerId) -> Result<Vec<Game>, Reject> {
        self.query(
            const_format::concatcp!(
                "SELECT ", GAME_COLS, " FROM ", GAMES,
                " WHERE player1_id = $1 OR player2_id = $1 ORDER BY updated_at DESC"
            ),
            &[&player.inner()],
        )
        .await?
        .iter()
        .map(Game::load)
        .collect()
    }

    async fn next_turn_number(&self, game: ID<Game>) -> Result<TurnNumber, Reject> {
        let row = self
            .query_one(
                const_format::concatcp!(
                    "SELECT COALESCE(MAX(turn_number), 0) + 1 FROM ",
                    TURNS,
                    " WHERE game_id = $1"
                ),
                &[&game.inner()],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn insert_turn(&self, turn: &Turn) -> Result<(), Reject> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                TURNS,
                " (",
                TURN_COLS,
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
            ),
            &[
                &turn.id().inner(),
                &turn.game().inner(),
                &turn.player().inner(),
                &turn.player_name(),
                &turn.number(),
                &turn.kind().as_str(),
                &turn.clip().description,
                &turn.clip().video_url,
                &turn.clip().duration_ms,
                &turn.clip().thumbnail_url,
                &turn.judgment().as_str(),
                &turn.judged_by().map(|p| p.inner()),
                &turn.judged_at(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn lock_turn(&self, id: ID<Turn>) -> Result<Option<Turn>, Reject> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ", TURN_COLS, " FROM ", TURNS, " WHERE id = $1 FOR UPDATE"
            ),
            &[&id.inner()],
        )
        .await?
        .map(|row| Turn::load(&row))
        .transpose()
    }

    async fn fetch_turn(&self, id: ID<Turn>) -> Result<Option<Turn>, Reject> {
        self.query_opt(
            const_format::concatcp!("SELECT ", TURN_COLS, " FROM ", TURNS, " WHERE id = $1"),
            &[&id.inner()],
        )
        .await?
        .map(|row| Turn::load(&row))
        .transpose()
    }

    async fn turns_of(&self, game: ID<Game>) -> Result<Vec<Turn>, Reject> {
        self.query(
            const_format::concatcp!(
                "SELECT ", TURN_COLS, " FROM ", TURNS,
                " WHERE game_id = $1 ORDER BY turn_number"
            ),
            &[&game.inner()],
        )
        .await?
        .iter()
        .map(Turn::load)
        .collect()
    }

    async fn response_after(&self, game: ID<Game>, number: TurnNumber) -> Result<bool, Reject> {
        let row = self
            .query_one(
                const_format::concatcp!(
                    "SELECT EXISTS(SELECT 1 FROM ",
                    TURNS,
                    " WHERE game_id = $1 AND turn_type = 'response' AND turn_number > $2)"
                ),
                &[&game.inner(), &number],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn apply_judgment(&self, update: &JudgeUpdate) -> Result<(), Reject> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                TURNS,
                " SET result = $2, judged_by = $3, judged_at = $4 WHERE id = $1"
            ),
            &[
                &update.turn.inner(),
                &update.judgment.as_str(),
                &update.by.inner(),
                &update.at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn game_of_turn(&self, turn: ID<Turn>) -> Result<Option<ID<Game>>, Reject> {
        Ok(self
            .query_opt(
                const_format::concatcp!("SELECT game_id FROM ", TURNS, " WHERE id = $1"),
                &[&turn.inner()],
            )
            .await?
            .map(|row| ID::from(row.get::<_, uuid::Uuid>(0))))
    }

    async fn insert_dispute(&self, dispute: &Dispute) -> Result<i64, Reject> {
        let row = self
            .query_one(
                const_format::concatcp!(
                    "INSERT INTO ",
                    DISPUTES,
                    " (game_id, turn_id, disputed_by, against_player_id, original_result, \
                       final_result, resolved_by, resolved_at, penalty_applied_to, created_at)
                      VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id"
                ),
                &[
                    &dispute.game().inner(),
                    &dispute.turn().inner(),
                    &dispute.disputed_by().inner(),
                    &dispute.against().inner(),
                    &dispute.original().as_str(),
                    &dispute.resolution().map(|v| v.as_str()),
                    &dispute.resolved_by().map(|p| p.inner()),
                    &dispute.resolved_at(),
                    &dispute.penalty_to().map(|p| p.inner()),
                    &dispute.created_at(),
                ],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn lock_dispute(&self, id: i64) -> Result<Option<Dispute>, Reject> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ", DISPUTE_COLS, " FROM ", DISPUTES, " WHERE id = $1 FOR UPDATE"
            ),
            &[&id],
        )
        .await?
        .map(|row| Dispute::load(&row))
        .transpose()
    }

    async fn disputes_of(&self, game: ID<Game>) -> Result<Vec<Dispute>, Reject> {
        self.query(
            const_format::concatcp!(
                "SELECT ", DISPUTE_COLS, " FROM ", DISPUTES,
                " WHERE game_id = $1 ORDER BY created_at"
            ),
            &[&game.inner()],
        )
        .await?
        .iter()
        .map(Dispute::load)
        .collect()
    }

    async fn update_dispute(&self, dispute: &Dispute) -> Result<(), Reject> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                DISPUTES,
                " SET final_result = $2, resolved_by = $3, resolved_at = $4, \
                   penalty_applied_to = $5 WHERE id = $1"
            ),
            &[
                &dispute.id(),
                &dispute.resolution().map(|v| v.as_str()),
                &dispute.resolved_by().map(|p| p.inner()),
                &dispute.resolved_at(),
                &dispute.penalty_to().map(|p| p.inner()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn game_of_dispute(&self, id: i64) -> Result<Option<ID<Game>>, Reject> {
        Ok(self
            .query_opt(
                const_format::concatcp!("SELECT game_id FROM ", DISPUTES, " WHERE id = $1"),
                &[&id],
            )
            .await?
            .map(|row| ID::from(row.get::<_, uuid::Uuid>(0))))
    }

    async fn bump_penalty(&self, player: PlayerId) -> Result<(), Reject> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                PROFILES,
                " SET dispute_penalties = dispute_penalties + 1 WHERE id = $1"
            ),
            &[&player.inner()],
        )
        .await?;
        Ok(())
    }

    async fn fetch_profile(&self, id: PlayerId) -> Result<Option<Profile>, Reject> {
        Ok(self
            .query_opt(
                const_format::concatcp!(
                    "SELECT id, username, dispute_penalties, preferences FROM ",
                    PROFILES,
                    " WHERE id = $1"
                ),
                &[&id.inner()],
            )
            .await?
            .map(|row| {
                let preferences: Preferences =
                    serde_json::from_value(row.get::<_, serde_json::Value>(3))
                        .unwrap_or_default();
                Profile::new(ID::from(row.get::<_, uuid::Uuid>(0)), row.get(1))
                    .with_penalties(row.get(2))
                    .with_preferences(preferences)
            }))
    }

    async fn ensure_profile(&self, id: PlayerId, username: &str) -> Result<(), Reject> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                PROFILES,
                " (id, username) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING"
            ),
            &[&id.inner(), &username],
        )
        .await?;
        Ok(())
    }

    async fn expired_games(&self) -> Result<Vec<(ID<Game>, SystemTime)>, Reject> {
        Ok(self
            .query(
                const_format::concatcp!(
                    "SELECT id, deadline_at FROM ",
                    GAMES,
                    " WHERE status = 'active' AND deadline_at < now() ORDER BY deadline_at"
                ),
                &[],
            )
            .await?
            .iter()
            .map(|row| (ID::from(row.get::<_, uuid::Uuid>(0)), row.get(1)))
            .collect())
    }

    async fn warnable_games(
        &self,
        window_secs: f64,
    ) -> Result<Vec<(ID<Game>, SystemTime)>, Reject> {
        Ok(self
            .query(
                const_format::concatcp!(
                    "SELECT id, deadline_at FROM ",
                    GAMES,
                    " WHERE status = 'active'
                        AND deadline_at > now()
                        AND deadline_at < now() + make_interval(secs => $1)
                      ORDER BY deadline_at"
                ),
                &[&window_secs],
            )
            .await?
            .iter()
            .map(|row| (ID::from(row.get::<_, uuid::Uuid>(0)), row.get(1)))
            .collect())
    }

    async fn stalled_games(&self, cap_secs: f64) -> Result<Vec<(ID<Game>, SystemTime)>, Reject> {
        Ok(self
            .query(
                const_format::concatcp!(
                    "SELECT id, created_at FROM ",
                    GAMES,
                    " WHERE status = 'active'
                        AND created_at < now() - make_interval(secs => $1)"
                ),
                &[&cap_secs],
            )
            .await?
            .iter()
            .map(|row| (ID::from(row.get::<_, uuid::Uuid>(0)), row.get(1)))
            .collect())
    }

    async fn lock_session(&self, id: ID<LiveSession>) -> Result<Option<LiveSession>, Reject> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ", SESSION_COLS, " FROM ", SESSIONS, " WHERE id = $1 FOR UPDATE"
            ),
            &[&id.inner()],
        )
        .await?
        .map(|row| LiveSession::load(&row))
        .transpose()
    }

    async fn fetch_session(&self, id: ID<LiveSession>) -> Result<Option<LiveSession>, Reject> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ", SESSION_COLS, " FROM ", SESSIONS, " WHERE id = $1"
            ),
            &[&id.inner()],
        )
        .await?
        .map(|row| LiveSession::load(&row))
        .transpose()
    }

    async fn insert_session(&self, session: &LiveSession) -> Result<(), Reject> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                SESSIONS,
                " (",
                SESSION_COLS,
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
            ),
            &[
                &session.id().inner(),
                &session.spot(),
                &session.creator().inner(),
                &session.players_json(),
                &(session.max_players() as i32),
                &session.status().as_str(),
                &session.action().map(|a| a.as_str()),
                &(session.cursor() as i32),
                &(session.setter() as i32),
                &session.current_trick(),
                &session.winner().map(|p| p.inner()),
                &session.deadline_at(),
                &session.paused_at(),
                &session.processed().raw(),
                &session.created_at(),
                &session.updated_at(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn update_session(&self, session: &LiveSession) -> Result<(), Reject> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                SESSIONS,
                " SET players = $2, status = $3, current_action = $4, \
                   current_turn_index = $5, setter_index = $6, current_trick = $7, \
                   winner_id = $8, turn_deadline_at = $9, paused_at = $10, \
                   processed_events = $11, updated_at = $12
                 WHERE id = $1"
            ),
            &[
                &session.id().inner(),
                &session.players_json(),
                &session.status().as_str(),
                &session.action().map(|a| a.as_str()),
                &(session.cursor() as i32),
                &(session.setter() as i32),
                &session.current_trick(),
                &session.winner().map(|p| p.inner()),
                &session.deadline_at(),
                &session.paused_at(),
                &session.processed().raw(),
                &session.updated_at(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn expired_sessions(&self) -> Result<Vec<(ID<LiveSession>, SystemTime)>, Reject> {
        Ok(self
            .query(
                const_format::concatcp!(
                    "SELECT id, turn_deadline_at FROM ",
                    SESSIONS,
                    " WHERE status = 'active' AND turn_deadline_at < now()
                      ORDER BY turn_deadline_at"
                ),
                &[],
            )
            .await?
            .iter()
            .map(|row| (ID::from(row.get::<_, uuid::Uuid>(0)), row.get(1)))
            .collect())
    }

    async fn paused_sessions(&self) -> Result<Vec<LiveSession>, Reject> {
        self.query(
            const_format::concatcp!(
                "SELECT ", SESSION_COLS, " FROM ", SESSIONS, " WHERE status = 'paused'"
            ),
            &[],
        )
        .await?
        .iter()
        .map(LiveSession::load)
        .collect()
    }

    async fn purge_sessions(&self, cap_secs: f64) -> Result<u64, Reject> {
        Ok(self
            .execute(
                const_format::concatcp!(
                    "DELETE FROM ",
                    SESSIONS,
                    " WHERE status IN ('completed', 'forfeited', 'waiting')
                        AND updated_at < now() - make_interval(secs => $1)"
                ),
                &[&cap_secs],
            )
            .await?)
    }
}
