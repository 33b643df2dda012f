use super::Dispute;
use super::Game;
use super::PlayerId;
use super::Turn;
use crate::ID;
use crate::notify::Kind;
use crate::rooms::RoomKey;
use crate::rules::Judgment;
use std::time::SystemTime;

/// Post-commit side effect. The gateway returns these to the transport
/// layer, which emits them in order after the transaction lands; rollback
/// therefore leaves no observable trace.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fan-out on a room topic.
    Broadcast {
        room: RoomKey,
        event: &'static str,
        payload: serde_json::Value,
        exclude: Option<PlayerId>,
    },
    /// One logical notification to one recipient.
    Notify {
        to: PlayerId,
        kind: Kind,
        payload: serde_json::Value,
    },
}

impl Effect {
    pub fn notify(to: PlayerId, kind: Kind, payload: serde_json::Value) -> Self {
        Self::Notify { to, kind, payload }
    }
    pub fn broadcast(room: RoomKey, event: &'static str, payload: serde_json::Value) -> Self {
        Self::Broadcast {
            room,
            event,
            payload,
            exclude: None,
        }
    }
}

/// The judgment-field mutation on a round's single `set` turn.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeUpdate {
    pub turn: ID<Turn>,
    pub judgment: Judgment,
    pub by: PlayerId,
    pub at: SystemTime,
}

/// Everything one accepted command writes, plus the effects to emit after
/// commit. The gateway applies the writes inside the open transaction in
/// this order: session row, turn insert, judgment update, dispute rows,
/// penalty counter.
#[derive(Debug, Clone)]
pub struct Transition {
    pub game: Game,
    pub new_turn: Option<Turn>,
    pub new_dispute: Option<Dispute>,
    pub resolve_dispute: Option<Dispute>,
    pub judge_update: Option<JudgeUpdate>,
    pub penalty_to: Option<PlayerId>,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn of(game: Game) -> Self {
        Self {
            game,
            new_turn: None,
            new_dispute: None,
            resolve_dispute: None,
            judge_update: None,
            penalty_to: None,
            effects: Vec::new(),
        }
    }
    pub fn with_turn(mut self, turn: Turn) -> Self {
        self.new_turn = Some(turn);
        self
    }
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}
