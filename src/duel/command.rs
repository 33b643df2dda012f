use super::Clip;
use super::EventId;
use super::Game;
use super::PlayerId;
use super::Turn;
use crate::ID;
use crate::rules::Verdict;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// A state-mutating intent against one duel session. The gateway executes
/// commands under the session's row lock; the event ID derived from a
/// command is what makes retries of the same intent idempotent.
#[derive(Debug, Clone)]
pub enum Command {
    Create {
        game: ID<Game>,
        challenger: PlayerId,
        challenger_name: String,
        opponent: PlayerId,
    },
    Respond {
        game: ID<Game>,
        actor: PlayerId,
        accept: bool,
    },
    Submit {
        game: ID<Game>,
        actor: PlayerId,
        clip: Clip,
        /// Client-supplied idempotency key; the clip URL stands in when absent.
        key: Option<String>,
    },
    Judge {
        turn: ID<Turn>,
        actor: PlayerId,
        verdict: Verdict,
    },
    SetterBail {
        game: ID<Game>,
        actor: PlayerId,
        key: Option<String>,
    },
    FileDispute {
        game: ID<Game>,
        actor: PlayerId,
        turn: ID<Turn>,
    },
    Resolve {
        dispute: i64,
        actor: PlayerId,
        verdict: Verdict,
    },
    Forfeit {
        game: ID<Game>,
        actor: PlayerId,
    },
    /// Reconciler: per-turn deadline passed. Sequence key is the deadline
    /// captured by the scan, so overlapping sweeps collapse to one event.
    Expire {
        game: ID<Game>,
        deadline: SystemTime,
    },
    /// Reconciler: deadline warning with cooldown.
    Warn {
        game: ID<Game>,
        deadline: SystemTime,
    },
    /// Reconciler: session older than the hard cap.
    Stall {
        game: ID<Game>,
        created: SystemTime,
    },
}

impl Command {
    /// Open-challenge intent. With a client key the session id itself is
    /// derived from `(challenger, opponent, key)`, so a retried create
    /// addresses the original row and replays instead of inserting a
    /// duplicate. Without a key every call opens a fresh challenge.
    pub fn create(
        challenger: PlayerId,
        challenger_name: String,
        opponent: PlayerId,
        key: Option<&str>,
    ) -> Self {
        let game = match key {
            Some(key) => ID::derived(&format!("create:{}:{}:{}", challenger, opponent, key)),
            None => ID::default(),
        };
        Self::Create {
            game,
            challenger,
            challenger_name,
            opponent,
        }
    }
    /// The session to lock, when the command names one directly. `Judge`
    /// and `Resolve` address a turn/dispute row; the gateway resolves the
    /// owning session before taking the lock.
    pub fn game(&self) -> Option<ID<Game>> {
        match self {
            Self::Create { game, .. }
            | Self::Respond { game, .. }
            | Self::Submit { game, .. }
            | Self::SetterBail { game, .. }
            | Self::FileDispute { game, .. }
            | Self::Forfeit { game, .. }
            | Self::Expire { game, .. }
            | Self::Warn { game, .. }
            | Self::Stall { game, .. } => Some(*game),
            Self::Judge { .. } | Self::Resolve { .. } => None,
        }
    }
    /// Deterministic event ID: (kind, session, actor, sequence key). The
    /// sequence key is whatever survives a client retry of the same intent
    /// unchanged. Setter-bail has no intrinsic key, so it accepts a
    /// client-supplied one and falls back to the open round's deadline in
    /// the canonical state passed in.
    pub fn event_id(&self, state: &Game) -> EventId {
        let name = match self {
            Self::Create { game, .. } => format!("create:{}", game),
            Self::Respond {
                game,
                actor,
                accept,
            } => format!("respond:{}:{}:{}", game, actor, accept),
            Self::Submit {
                game,
                actor,
                clip,
                key,
            } => match key {
                Some(key) => format!("client:{}:{}:{}", game, actor, key),
                None => format!("submit:{}:{}:{}", game, actor, clip.video_url),
            },
            Self::Judge {
                turn,
                actor,
                verdict,
            } => format!("judge:{}:{}:{}", turn, actor, verdict),
            Self::SetterBail { game, actor, key } => match key {
                Some(key) => format!("client:{}:{}:{}", game, actor, key),
                None => format!(
                    "setter_bail:{}:{}:{}",
                    game,
                    actor,
                    state.deadline_at().map(millis).unwrap_or_default()
                ),
            },
            Self::FileDispute { game, actor, turn } => {
                format!("dispute:{}:{}:{}", game, actor, turn)
            }
            Self::Resolve {
                dispute,
                actor,
                verdict,
            } => format!("resolve:{}:{}:{}", dispute, actor, verdict),
            Self::Forfeit { game, actor } => format!("forfeit:{}:{}", game, actor),
            Self::Expire { game, deadline } => {
                format!("expire:{}:{}", game, millis(*deadline))
            }
            Self::Warn { game, deadline } => format!("warn:{}:{}", game, millis(*deadline)),
            Self::Stall { game, created } => format!("stall:{}:{}", game, millis(*created)),
        };
        EventId::derived(&name)
    }
}

fn millis(t: SystemTime) -> u128 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(id: ID<Game>, p1: PlayerId) -> Game {
        Game::challenge(
            id,
            p1,
            String::from("p1"),
            PlayerId::default(),
            String::from("p2"),
            SystemTime::now(),
        )
    }

    #[test]
    fn retries_derive_the_same_id() {
        let game = ID::<Game>::default();
        let actor = PlayerId::default();
        let state = fixture(game, actor);
        let cmd = Command::Respond {
            game,
            actor,
            accept: true,
        };
        assert_eq!(cmd.event_id(&state), cmd.event_id(&state));
    }
    #[test]
    fn different_intents_differ() {
        let game = ID::<Game>::default();
        let actor = PlayerId::default();
        let state = fixture(game, actor);
        let accept = Command::Respond {
            game,
            actor,
            accept: true,
        };
        let decline = Command::Respond {
            game,
            actor,
            accept: false,
        };
        assert_ne!(accept.event_id(&state), decline.event_id(&state));
    }
    #[test]
    fn client_key_pins_the_id() {
        let game = ID::<Game>::default();
        let actor = PlayerId::default();
        let state = fixture(game, actor);
        let a = Command::SetterBail {
            game,
            actor,
            key: Some(String::from("attempt-1")),
        };
        let b = Command::SetterBail {
            game,
            actor,
            key: Some(String::from("attempt-2")),
        };
        assert_eq!(a.event_id(&state), a.event_id(&state));
        assert_ne!(a.event_id(&state), b.event_id(&state));
    }
    #[test]
    fn keyed_challenges_reuse_the_session_id() {
        let challenger = PlayerId::default();
        let opponent = PlayerId::default();
        let first = Command::create(challenger, String::from("a"), opponent, Some("nonce-1"));
        let retry = Command::create(challenger, String::from("a"), opponent, Some("nonce-1"));
        let other = Command::create(challenger, String::from("a"), opponent, Some("nonce-2"));
        assert_eq!(first.game(), retry.game());
        assert_ne!(first.game(), other.game());
        let state = fixture(first.game().unwrap(), challenger);
        assert_eq!(first.event_id(&state), retry.event_id(&state));
    }
    #[test]
    fn unkeyed_challenges_stay_distinct() {
        let challenger = PlayerId::default();
        let opponent = PlayerId::default();
        let a = Command::create(challenger, String::from("a"), opponent, None);
        let b = Command::create(challenger, String::from("a"), opponent, None);
        assert_ne!(a.game(), b.game());
    }
    #[test]
    fn expire_keys_on_the_scanned_deadline() {
        let game = ID::<Game>::default();
        let state = fixture(game, PlayerId::default());
        let t1 = UNIX_EPOCH + std::time::Duration::from_secs(1_000);
        let t2 = UNIX_EPOCH + std::time::Duration::from_secs(2_000);
        let a = Command::Expire { game, deadline: t1 };
        let b = Command::Expire { game, deadline: t2 };
        assert_eq!(a.event_id(&state), a.event_id(&state));
        assert_ne!(a.event_id(&state), b.event_id(&state));
    }
}
