//! Async 1v1 duel domain.
//!
//! The entities the persistence layer stores ([`Game`], [`Turn`],
//! [`Dispute`], [`Profile`]), the commands the gateway executes
//! ([`Command`] with deterministic event IDs), and the pure engine that
//! turns `(loaded state, command)` into a [`Transition`] of row writes and
//! post-commit [`Effect`]s. Everything except the gateway itself is
//! side-effect free.

mod clip;
mod command;
mod dispute;
pub mod engine;
mod events;
mod game;
mod profile;
mod reject;
mod transition;
mod turn;

pub use clip::*;
pub use command::*;
pub use dispute::*;
pub use events::*;
pub use game::*;
pub use profile::*;
pub use reject::*;
pub use transition::*;
pub use turn::*;

#[cfg(test)]
mod properties {
    use super::*;
    use crate::ID;
    use crate::Knobs;
    use crate::TurnNumber;
    use crate::Unique;
    use crate::rules::*;
    use proptest::prelude::*;
    use std::time::Duration;
    use std::time::UNIX_EPOCH;

    const HOST: &str = "media.skateduel.app";

    /// One random input thrown at the engine: which operation, which of
    /// the two players (or a stranger), and the verdict where one applies.
    #[derive(Debug, Clone, Copy)]
    struct Op {
        kind: u8,
        actor: u8,
        landed: bool,
    }

    fn ops() -> impl Strategy<Value = Vec<Op>> {
        proptest::collection::vec(
            (0u8..6, 0u8..3, any::<bool>()).prop_map(|(kind, actor, landed)| Op {
                kind,
                actor,
                landed,
            }),
            0..80,
        )
    }

    fn clip(tag: usize) -> Clip {
        Clip {
            description: format!("trick {}", tag),
            video_url: format!("https://{}/clips/{}.mp4", HOST, tag),
            duration_ms: 9_000,
            thumbnail_url: None,
        }
    }

    /// Session invariants, checked after every accepted mutation.
    fn check(game: &Game) {
        for seat in [game.player1(), game.player2()] {
            assert!(WORD.starts_with(seat.letters.as_str()));
        }
        match game.phase() {
            Phase::Active => {
                let current = game.current_turn().expect("active games point at an actor");
                assert!(game.is_player(current));
                match game.turn_phase().expect("active games carry a sub-phase") {
                    TurnPhase::SetTrick => assert_eq!(current, game.offensive()),
                    TurnPhase::RespondTrick | TurnPhase::Judge => {
                        assert_eq!(current, game.defensive())
                    }
                }
                assert!(game.deadline_at().is_some());
            }
            Phase::Pending => {}
            Phase::Paused => unreachable!("duels never pause"),
            terminal => {
                assert!(terminal.terminal());
                assert!(game.turn_phase().is_none());
                assert!(game.current_turn().is_none());
                assert!(game.deadline_at().is_none());
                if terminal != Phase::Declined {
                    assert!(game.winner().is_some());
                }
            }
        }
    }

    proptest! {
        // ∀ op sequences: invariants hold at every accepted transition,
        // turn numbers stay dense, terminal states absorb everything
        #[test]
        fn engine_preserves_session_invariants(ops in ops()) {
            let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
            let knobs = Knobs {
                turn_deadline: Duration::from_secs(86_400),
                hard_cap: Duration::from_secs(604_800),
                reconnect_window: Duration::from_secs(120),
                video_cap_ms: 15_000,
                dedup_cap: 100,
            };
            let p1 = PlayerId::default();
            let p2 = PlayerId::default();
            let stranger = PlayerId::default();
            let mut game = engine::create(
                ID::default(),
                p1,
                String::from("p1"),
                p2,
                String::from("p2"),
                now,
            )
            .unwrap()
            .game;
            check(&game);
            let mut turns: Vec<Turn> = Vec::new();

            for (step, op) in ops.into_iter().enumerate() {
                let actor = [p1, p2, stranger][op.actor as usize];
                let verdict = match op.landed {
                    true => Verdict::Landed,
                    false => Verdict::Missed,
                };
                let was_terminal = game.phase().terminal();
                let result = match op.kind {
                    0 => engine::respond(game.clone(), actor, op.landed, now, &knobs),
                    1 => {
                        let number = turns.len() as TurnNumber + 1;
                        engine::submit(game.clone(), actor, clip(step), number, now, &knobs, HOST)
                    }
                    2 | 3 => {
                        let set = turns
                            .iter()
                            .rev()
                            .find(|t| t.kind() == TurnKind::Set && t.judgment().pending());
                        let Some(set) = set else { continue };
                        let responded = turns.iter().any(|t| {
                            t.kind() == TurnKind::Response && t.number() > set.number()
                        });
                        engine::judge(game.clone(), set, responded, actor, verdict, now, &knobs)
                    }
                    4 => engine::setter_bail(game.clone(), actor, now, &knobs),
                    _ => engine::forfeit(game.clone(), actor, now),
                };
                match result {
                    Ok(transition) => {
                        prop_assert!(!was_terminal, "terminal states absorb every command");
                        if let Some(turn) = transition.new_turn.clone() {
                            // dense, strictly monotone turn numbers
                            prop_assert_eq!(turn.number(), turns.len() as TurnNumber + 1);
                            turns.push(turn);
                        }
                        if let Some(update) = transition.judge_update.clone() {
                            let set = turns
                                .iter_mut()
                                .find(|t| t.id() == update.turn)
                                .expect("judged turn exists");
                            prop_assert!(set.judgment().pending());
                            set.judge(update.judgment, update.by, update.at);
                        }
                        game = transition.game;
                        check(&game);
                    }
                    Err(_) => {
                        // rejected commands must not have touched anything;
                        // the clone-in call convention guarantees it here,
                        // and the gateway guarantees it via rollback
                    }
                }
            }
        }
    }
}
