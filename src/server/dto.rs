use crate::ID;
use crate::Unique;
use crate::duel::*;
use crate::rules::Judgment;
use crate::rules::Phase;
use crate::rules::TurnPhase;
use crate::rules::Verdict;
use serde::Deserialize;
use serde::Serialize;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

// requests: strict schemas, extras rejected

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub opponent_id: PlayerId,
    /// Optional idempotency key; retries carrying the same key replay the
    /// original challenge instead of opening a second one.
    pub event_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RespondRequest {
    pub accept: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SubmitTurnRequest {
    pub trick_description: String,
    pub video_url: String,
    pub video_duration_ms: crate::Millis,
    pub thumbnail_url: Option<String>,
    /// Optional idempotency key for safe retries.
    pub event_key: Option<String>,
}

impl SubmitTurnRequest {
    pub fn clip(&self) -> Clip {
        Clip {
            description: self.trick_description.clone(),
            video_url: self.video_url.clone(),
            duration_ms: self.video_duration_ms,
            thumbnail_url: self.thumbnail_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct JudgeRequest {
    pub result: Verdict,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SetterBailRequest {
    pub event_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct DisputeRequest {
    pub turn_id: ID<Turn>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ResolveRequest {
    pub final_result: Verdict,
}

// responses

fn epoch_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub id: ID<Game>,
    pub player1_id: PlayerId,
    pub player1_name: String,
    pub player2_id: PlayerId,
    pub player2_name: String,
    pub status: Phase,
    pub turn_phase: Option<TurnPhase>,
    pub current_turn: Option<PlayerId>,
    pub offensive_player_id: PlayerId,
    pub defensive_player_id: PlayerId,
    pub player1_letters: String,
    pub player2_letters: String,
    pub last_trick_description: Option<String>,
    pub last_trick_by: Option<PlayerId>,
    pub deadline_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub winner_id: Option<PlayerId>,
    pub player1_dispute_used: bool,
    pub player2_dispute_used: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<&Game> for GameView {
    fn from(game: &Game) -> Self {
        Self {
            id: game.id(),
            player1_id: game.player1().player,
            player1_name: game.player1().name.clone(),
            player2_id: game.player2().player,
            player2_name: game.player2().name.clone(),
            status: game.phase(),
            turn_phase: game.turn_phase(),
            current_turn: game.current_turn(),
            offensive_player_id: game.offensive(),
            defensive_player_id: game.defensive(),
            player1_letters: game.player1().letters.as_str().to_string(),
            player2_letters: game.player2().letters.as_str().to_string(),
            last_trick_description: game.last_trick().map(|t| t.description.clone()),
            last_trick_by: game.last_trick().map(|t| t.by),
            deadline_at: game.deadline_at().map(epoch_millis),
            completed_at: game.completed_at().map(epoch_millis),
            winner_id: game.winner(),
            player1_dispute_used: game.player1().dispute_used,
            player2_dispute_used: game.player2().dispute_used,
            created_at: epoch_millis(game.created_at()),
            updated_at: epoch_millis(game.updated_at()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnView {
    pub id: ID<Turn>,
    pub game_id: ID<Game>,
    pub player_id: PlayerId,
    pub player_name: String,
    pub turn_number: crate::TurnNumber,
    pub turn_type: TurnKind,
    pub trick_description: String,
    pub video_url: String,
    pub video_duration_ms: crate::Millis,
    pub thumbnail_url: Option<String>,
    pub result: Judgment,
    pub judged_by: Option<PlayerId>,
    pub judged_at: Option<u64>,
}

impl From<&Turn> for TurnView {
    fn from(turn: &Turn) -> Self {
        Self {
            id: turn.id(),
            game_id: turn.game(),
            player_id: turn.player(),
            player_name: turn.player_name().to_string(),
            turn_number: turn.number(),
            turn_type: turn.kind(),
            trick_description: turn.clip().description.clone(),
            video_url: turn.clip().video_url.clone(),
            video_duration_ms: turn.clip().duration_ms,
            thumbnail_url: turn.clip().thumbnail_url.clone(),
            result: turn.judgment(),
            judged_by: turn.judged_by(),
            judged_at: turn.judged_at().map(epoch_millis),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisputeView {
    pub id: i64,
    pub game_id: ID<Game>,
    pub turn_id: ID<Turn>,
    pub disputed_by: PlayerId,
    pub against_player_id: PlayerId,
    pub original_result: Judgment,
    pub final_result: Option<Verdict>,
    pub resolved_by: Option<PlayerId>,
    pub resolved_at: Option<u64>,
    pub penalty_applied_to: Option<PlayerId>,
    pub created_at: u64,
}

impl From<&Dispute> for DisputeView {
    fn from(dispute: &Dispute) -> Self {
        Self {
            id: dispute.id(),
            game_id: dispute.game(),
            turn_id: dispute.turn(),
            disputed_by: dispute.disputed_by(),
            against_player_id: dispute.against(),
            original_result: dispute.original(),
            final_result: dispute.resolution(),
            resolved_by: dispute.resolved_by(),
            resolved_at: dispute.resolved_at().map(epoch_millis),
            penalty_applied_to: dispute.penalty_to(),
            created_at: epoch_millis(dispute.created_at()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyGamesView {
    pub pending_challenges: Vec<GameView>,
    pub sent_challenges: Vec<GameView>,
    pub active_games: Vec<GameView>,
    pub completed_games: Vec<GameView>,
    pub total: usize,
}

impl MyGamesView {
    pub fn partition(viewer: PlayerId, games: &[Game]) -> Self {
        let mut view = Self {
            pending_challenges: Vec::new(),
            sent_challenges: Vec::new(),
            active_games: Vec::new(),
            completed_games: Vec::new(),
            total: games.len(),
        };
        for game in games {
            let bucket = match game.phase() {
                Phase::Pending if game.player2().player == viewer => &mut view.pending_challenges,
                Phase::Pending => &mut view.sent_challenges,
                Phase::Active | Phase::Paused => &mut view.active_games,
                _ => &mut view.completed_games,
            };
            bucket.push(GameView::from(game));
        }
        view
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDetailView {
    pub game: GameView,
    pub turns: Vec<TurnView>,
    pub disputes: Vec<DisputeView>,
    pub is_my_turn: bool,
    pub needs_to_judge: bool,
    pub needs_to_respond: bool,
    pub pending_turn_id: Option<ID<Turn>>,
    pub can_dispute: bool,
}

impl GameDetailView {
    pub fn assemble(viewer: PlayerId, game: &Game, turns: &[Turn], disputes: &[Dispute]) -> Self {
        let my_turn = game.phase() == Phase::Active && game.current_turn() == Some(viewer);
        let pending_set = turns
            .iter()
            .rev()
            .find(|t| t.kind() == TurnKind::Set && t.judgment().pending());
        let quota_free = game.seat(viewer).map(|s| !s.dispute_used).unwrap_or(false);
        let can_dispute = quota_free
            && turns.iter().any(|t| {
                t.kind() == TurnKind::Set
                    && t.player() == viewer
                    && t.judgment() == Judgment::Missed
            });
        Self {
            game: GameView::from(game),
            turns: turns.iter().map(TurnView::from).collect(),
            disputes: disputes.iter().map(DisputeView::from).collect(),
            is_my_turn: my_turn,
            needs_to_judge: my_turn && game.turn_phase() == Some(TurnPhase::Judge),
            needs_to_respond: my_turn && game.turn_phase() == Some(TurnPhase::RespondTrick),
            pending_turn_id: pending_set.map(|t| t.id()),
            can_dispute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_requests_reject_extras() {
        assert!(serde_json::from_str::<CreateGameRequest>(
            r#"{"opponentId":"018f4e9a-0000-7000-8000-000000000000","extra":1}"#
        )
        .is_err());
        assert!(serde_json::from_str::<RespondRequest>(r#"{"accept":true}"#).is_ok());
    }
    #[test]
    fn judge_request_rejects_pending() {
        assert!(serde_json::from_str::<JudgeRequest>(r#"{"result":"landed"}"#).is_ok());
        assert!(serde_json::from_str::<JudgeRequest>(r#"{"result":"missed"}"#).is_ok());
        assert!(serde_json::from_str::<JudgeRequest>(r#"{"result":"pending"}"#).is_err());
    }
    #[test]
    fn setter_bail_accepts_empty_body() {
        assert!(serde_json::from_str::<SetterBailRequest>("{}").is_ok());
    }
    #[test]
    fn my_games_partition_buckets_by_phase_and_side() {
        use std::time::SystemTime;
        let viewer = PlayerId::default();
        let other = PlayerId::default();
        let now = SystemTime::now();
        let incoming = Game::challenge(
            ID::default(),
            other,
            String::from("a"),
            viewer,
            String::from("b"),
            now,
        );
        let outgoing = Game::challenge(
            ID::default(),
            viewer,
            String::from("b"),
            other,
            String::from("a"),
            now,
        );
        let view = MyGamesView::partition(viewer, &[incoming, outgoing]);
        assert_eq!(view.pending_challenges.len(), 1);
        assert_eq!(view.sent_challenges.len(), 1);
        assert_eq!(view.total, 2);
    }
}
