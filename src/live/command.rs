use super::LiveSession;
use crate::ID;
use crate::duel::EventId;
use crate::duel::PlayerId;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// A state-mutating intent against one live session, mirroring
/// [`crate::duel::Command`] for the socket variant.
#[derive(Debug, Clone)]
pub enum LiveCommand {
    Create {
        session: ID<LiveSession>,
        spot: String,
        creator: PlayerId,
        creator_name: String,
        max_players: usize,
    },
    Join {
        session: ID<LiveSession>,
        player: PlayerId,
        name: String,
    },
    Trick {
        session: ID<LiveSession>,
        actor: PlayerId,
        trick_name: String,
        clip_url: Option<String>,
    },
    Pass {
        session: ID<LiveSession>,
        actor: PlayerId,
    },
    Forfeit {
        session: ID<LiveSession>,
        actor: PlayerId,
    },
    Disconnect {
        session: ID<LiveSession>,
        actor: PlayerId,
    },
    Reconnect {
        session: ID<LiveSession>,
        actor: PlayerId,
    },
    /// Reconciler: 60-second turn clock ran out.
    Expire {
        session: ID<LiveSession>,
        deadline: SystemTime,
    },
    /// Reconciler: reconnect window closed on a disconnected player.
    /// `since` is the disconnect timestamp captured by the scan.
    ReconnectTimeout {
        session: ID<LiveSession>,
        player: PlayerId,
        since: SystemTime,
    },
}

impl LiveCommand {
    pub fn session(&self) -> ID<LiveSession> {
        match self {
            Self::Create { session, .. }
            | Self::Join { session, .. }
            | Self::Trick { session, .. }
            | Self::Pass { session, .. }
            | Self::Forfeit { session, .. }
            | Self::Disconnect { session, .. }
            | Self::Reconnect { session, .. }
            | Self::Expire { session, .. }
            | Self::ReconnectTimeout { session, .. } => *session,
        }
    }
    /// Deterministic event ID. Turn-scoped commands key on the canonical
    /// deadline so an overlapping retry inside the same turn collapses;
    /// reconciler commands key on the timestamp their scan captured.
    pub fn event_id(&self, state: &LiveSession) -> EventId {
        let name = match self {
            Self::Create { session, .. } => format!("live_create:{}", session),
            Self::Join { session, player, .. } => format!("live_join:{}:{}", session, player),
            Self::Trick { session, actor, .. } => format!(
                "live_trick:{}:{}:{}",
                session,
                actor,
                deadline_key(state)
            ),
            Self::Pass { session, actor } => {
                format!("live_pass:{}:{}:{}", session, actor, deadline_key(state))
            }
            Self::Forfeit { session, actor } => format!("live_forfeit:{}:{}", session, actor),
            Self::Disconnect { session, actor } => format!(
                "live_disc:{}:{}:{}",
                session,
                actor,
                deadline_key(state)
            ),
            Self::Reconnect { session, actor } => format!(
                "live_conn:{}:{}:{}",
                session,
                actor,
                state.paused_at().map(millis).unwrap_or_default()
            ),
            Self::Expire { session, deadline } => {
                format!("live_expire:{}:{}", session, millis(*deadline))
            }
            Self::ReconnectTimeout {
                session,
                player,
                since,
            } => format!("live_rcto:{}:{}:{}", session, player, millis(*since)),
        };
        EventId::derived(&name)
    }
}

fn deadline_key(state: &LiveSession) -> u128 {
    state.deadline_at().map(millis).unwrap_or_default()
}

fn millis(t: SystemTime) -> u128 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}
