use super::LiveSession;
use super::Slot;
use crate::ID;
use crate::Unique;
use crate::duel::PlayerId;
use crate::rules::Letters;
use serde::Deserialize;
use serde::Serialize;

/// Presence status shared across the socket fabric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Away,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Offline => "offline",
        }
    }
}

impl TryFrom<&str> for PresenceStatus {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "online" => Ok(Self::Online),
            "away" => Ok(Self::Away),
            "offline" => Ok(Self::Offline),
            other => Err(format!("unknown presence status: {}", other)),
        }
    }
}

/// Messages from client to server over the live socket.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "game:create", rename_all = "camelCase")]
    Create { spot_id: String, max_players: usize },
    #[serde(rename = "game:join", rename_all = "camelCase")]
    Join { game_id: ID<LiveSession> },
    #[serde(rename = "game:trick", rename_all = "camelCase")]
    Trick {
        game_id: ID<LiveSession>,
        trick_name: String,
        clip_url: Option<String>,
    },
    #[serde(rename = "game:pass", rename_all = "camelCase")]
    Pass { game_id: ID<LiveSession> },
    #[serde(rename = "game:forfeit", rename_all = "camelCase")]
    Forfeit { game_id: ID<LiveSession> },
    #[serde(rename = "game:reconnect", rename_all = "camelCase")]
    Reconnect { game_id: ID<LiveSession> },
    #[serde(rename = "presence:update", rename_all = "camelCase")]
    Presence { status: PresenceStatus },
}

impl ClientMessage {
    /// Event name for rate limiting and logging.
    pub fn event(&self) -> &'static str {
        match self {
            Self::Create { .. } => "game:create",
            Self::Join { .. } => "game:join",
            Self::Trick { .. } => "game:trick",
            Self::Pass { .. } => "game:pass",
            Self::Forfeit { .. } => "game:forfeit",
            Self::Reconnect { .. } => "game:reconnect",
            Self::Presence { .. } => "presence:update",
        }
    }
}

/// One slot as it rides in wire payloads.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSlot {
    pub player: PlayerId,
    pub name: String,
    pub letters: Letters,
    pub connected: bool,
    pub forfeited: bool,
}

impl From<&Slot> for WireSlot {
    fn from(slot: &Slot) -> Self {
        Self {
            player: slot.player,
            name: slot.name.clone(),
            letters: slot.letters,
            connected: slot.connected,
            forfeited: slot.forfeited,
        }
    }
}

/// Messages from server to clients. Internally tagged so clients can
/// dispatch on `type`.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "game:created", rename_all = "camelCase")]
    Created {
        game_id: ID<LiveSession>,
        spot_id: String,
        max_players: usize,
    },
    #[serde(rename = "game:joined", rename_all = "camelCase")]
    Joined {
        game_id: ID<LiveSession>,
        player: PlayerId,
        name: String,
        players: Vec<WireSlot>,
    },
    #[serde(rename = "game:turn", rename_all = "camelCase")]
    Turn {
        game_id: ID<LiveSession>,
        current_player: Option<PlayerId>,
        action: String,
        time_limit: u64,
    },
    #[serde(rename = "game:trick", rename_all = "camelCase")]
    Trick {
        game_id: ID<LiveSession>,
        player: PlayerId,
        trick_name: String,
        clip_url: Option<String>,
    },
    #[serde(rename = "game:letter", rename_all = "camelCase")]
    Letter {
        game_id: ID<LiveSession>,
        player: PlayerId,
        letters: Letters,
    },
    #[serde(rename = "game:paused", rename_all = "camelCase")]
    Paused {
        game_id: ID<LiveSession>,
        disconnected_player: PlayerId,
        reconnect_timeout: u64,
    },
    #[serde(rename = "game:resumed", rename_all = "camelCase")]
    Resumed {
        game_id: ID<LiveSession>,
        reconnected_player: PlayerId,
    },
    #[serde(rename = "game:state", rename_all = "camelCase")]
    State {
        game_id: ID<LiveSession>,
        spot_id: String,
        status: String,
        action: Option<String>,
        current_player: Option<PlayerId>,
        current_trick: Option<String>,
        players: Vec<WireSlot>,
        winner_id: Option<PlayerId>,
    },
    #[serde(rename = "game:ended", rename_all = "camelCase")]
    Ended {
        game_id: ID<LiveSession>,
        winner_id: Option<PlayerId>,
        final_standings: Vec<WireSlot>,
    },
    #[serde(rename = "presence:update", rename_all = "camelCase")]
    Presence {
        user_id: PlayerId,
        status: PresenceStatus,
    },
    #[serde(rename = "error", rename_all = "camelCase")]
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn created(session: &LiveSession) -> Self {
        Self::Created {
            game_id: session.id(),
            spot_id: session.spot().to_string(),
            max_players: session.max_players(),
        }
    }
    pub fn joined(session: &LiveSession, player: PlayerId, name: String) -> Self {
        Self::Joined {
            game_id: session.id(),
            player,
            name,
            players: session.slots().iter().map(WireSlot::from).collect(),
        }
    }
    pub fn turn(
        game_id: ID<LiveSession>,
        current_player: Option<PlayerId>,
        action: &str,
        time_limit: u64,
    ) -> Self {
        Self::Turn {
            game_id,
            current_player,
            action: action.to_string(),
            time_limit,
        }
    }
    pub fn trick(
        game_id: ID<LiveSession>,
        player: PlayerId,
        trick_name: String,
        clip_url: Option<String>,
    ) -> Self {
        Self::Trick {
            game_id,
            player,
            trick_name,
            clip_url,
        }
    }
    pub fn letter(game_id: ID<LiveSession>, player: PlayerId, letters: Letters) -> Self {
        Self::Letter {
            game_id,
            player,
            letters,
        }
    }
    pub fn paused(game_id: ID<LiveSession>, player: PlayerId, reconnect_timeout: u64) -> Self {
        Self::Paused {
            game_id,
            disconnected_player: player,
            reconnect_timeout,
        }
    }
    pub fn resumed(game_id: ID<LiveSession>, player: PlayerId) -> Self {
        Self::Resumed {
            game_id,
            reconnected_player: player,
        }
    }
    pub fn state(session: &LiveSession) -> Self {
        Self::State {
            game_id: session.id(),
            spot_id: session.spot().to_string(),
            status: session.status().as_str().to_string(),
            action: session.action().map(|a| a.as_str().to_string()),
            current_player: session.current_player(),
            current_trick: session.current_trick().map(String::from),
            players: session.slots().iter().map(WireSlot::from).collect(),
            winner_id: session.winner(),
        }
    }
    pub fn ended(session: &LiveSession) -> Self {
        Self::Ended {
            game_id: session.id(),
            winner_id: session.winner(),
            final_standings: session.slots().iter().map(WireSlot::from).collect(),
        }
    }
    pub fn presence(user_id: PlayerId, status: PresenceStatus) -> Self {
        Self::Presence { user_id, status }
    }
    pub fn error(code: &str, message: &str) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("serialize server message")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_by_type_tag() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"game:create","spotId":"embarcadero","maxPlayers":4}"#)
                .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Create { ref spot_id, max_players: 4 } if spot_id == "embarcadero"
        ));
        assert_eq!(msg.event(), "game:create");
    }
    #[test]
    fn unknown_client_types_fail() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"game:cheat"}"#).is_err());
    }
    #[test]
    fn server_messages_carry_the_type_tag() {
        let json = ServerMessage::error("NOT_YOUR_TURN", "it is not your turn").to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "NOT_YOUR_TURN");
    }
    #[test]
    fn presence_round_trips() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"presence:update","status":"away"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Presence { status: PresenceStatus::Away }
        ));
    }
}
