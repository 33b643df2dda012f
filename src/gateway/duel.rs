use super::Repository;
use crate::Unique;
use crate::DEADLINE_WARNING_COOLDOWN_SECS;
use crate::DEADLINE_WARNING_WINDOW_SECS;
use crate::Knobs;
use crate::duel::*;
use crate::duel::engine;
use std::time::Duration;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tokio_postgres::Client;
use tokio_postgres::IsolationLevel;

/// Result of one accepted (or deduplicated) duel command.
#[derive(Debug)]
pub struct Outcome {
    pub game: Game,
    pub already_processed: bool,
    pub effects: Vec<Effect>,
    pub turn: Option<Turn>,
    pub dispute: Option<Dispute>,
}

impl Outcome {
    fn replayed(game: Game) -> Self {
        Self {
            game,
            already_processed: true,
            effects: Vec::new(),
            turn: None,
            dispute: None,
        }
    }
    pub fn game_over(&self) -> bool {
        self.game.phase().terminal()
    }
}

/// The duel side of the transactional gateway. Owns the writer connection;
/// one session mutation at a time per process, with the row lock carrying
/// correctness across processes.
pub struct Gateway {
    client: Mutex<Client>,
    knobs: Knobs,
    live_knobs: Knobs,
    host: String,
    warning_window: Duration,
    warning_cooldown: Duration,
}

impl Gateway {
    pub fn new(client: Client) -> Self {
        Self {
            client: Mutex::new(client),
            knobs: Knobs::duel(),
            live_knobs: Knobs::live(),
            host: crate::video_host(),
            warning_window: Duration::from_secs(crate::env_u64(
                "DEADLINE_WARNING_WINDOW_SECS",
                DEADLINE_WARNING_WINDOW_SECS,
            )),
            warning_cooldown: Duration::from_secs(crate::env_u64(
                "DEADLINE_WARNING_COOLDOWN_SECS",
                DEADLINE_WARNING_COOLDOWN_SECS,
            )),
        }
    }
    pub fn knobs(&self) -> &Knobs {
        &self.knobs
    }
    pub(crate) fn live_knobs(&self) -> &Knobs {
        &self.live_knobs
    }
    pub(crate) async fn writer(&self) -> tokio::sync::MutexGuard<'_, Client> {
        self.client.lock().await
    }

    /// The mutation envelope: lock the session row, re-read canonical
    /// state, consult the idempotency log, validate and compute through
    /// the engine, write, append the event ID, commit. A transaction
    /// dropped on any error path rolls back, so rejection is
    /// indistinguishable from "never happened".
    pub async fn execute(&self, command: Command) -> Result<Outcome, Reject> {
        let now = SystemTime::now();
        let mut client = self.client.lock().await;
        let target = match command.game() {
            Some(id) => id,
            None => match &command {
                Command::Judge { turn, .. } => client
                    .game_of_turn(*turn)
                    .await?
                    .ok_or(Reject::TurnNotFound)?,
                Command::Resolve { dispute, .. } => client
                    .game_of_dispute(*dispute)
                    .await?
                    .ok_or(Reject::DisputeNotFound)?,
                _ => unreachable!("all other commands carry the session id"),
            },
        };
        let tx = client
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .await?;

        if let Command::Create {
            game,
            challenger,
            challenger_name,
            opponent,
        } = &command
        {
            // keyed creates derive the session id from the intent, so a
            // retry locks the original row and replays from its log
            if let Some(existing) = tx.lock_game(*game).await? {
                let event = command.event_id(&existing);
                if existing.processed().contains(event) {
                    tx.commit().await?;
                    log::debug!("[game {}] challenge already processed", game);
                    return Ok(Outcome::replayed(existing));
                }
                return Err(Reject::Validation(String::from("game id already in use")));
            }
            tx.ensure_profile(*challenger, challenger_name).await?;
            let profile = tx
                .fetch_profile(*opponent)
                .await?
                .ok_or(Reject::OpponentNotFound)?;
            let transition = engine::create(
                *game,
                *challenger,
                challenger_name.clone(),
                *opponent,
                profile.username().to_string(),
                now,
            )?;
            let mut fresh = transition.game;
            let event_id = command.event_id(&fresh);
            fresh.processed_mut().remember(event_id, self.knobs.dedup_cap);
            tx.insert_game(&fresh).await?;
            tx.commit().await?;
            log::info!("[game {}] challenge opened by {}", fresh.id(), challenger);
            return Ok(Outcome {
                game: fresh,
                already_processed: false,
                effects: transition.effects,
                turn: None,
                dispute: None,
            });
        }

        let game = tx.lock_game(target).await?.ok_or(Reject::GameNotFound)?;
        let event = command.event_id(&game);
        if game.processed().contains(event) {
            tx.commit().await?;
            log::debug!("[game {}] event {} already processed", target, event);
            return Ok(Outcome::replayed(game));
        }

        let mut transition = match &command {
            Command::Respond { actor, accept, .. } => {
                engine::respond(game, *actor, *accept, now, &self.knobs)?
            }
            Command::Submit { actor, clip, .. } => {
                let number = tx.next_turn_number(target).await?;
                engine::submit(game, *actor, clip.clone(), number, now, &self.knobs, &self.host)?
            }
            Command::Judge {
                turn,
                actor,
                verdict,
            } => {
                let set = tx.lock_turn(*turn).await?.ok_or(Reject::TurnNotFound)?;
                let has_response = tx.response_after(target, set.number()).await?;
                engine::judge(game, &set, has_response, *actor, *verdict, now, &self.knobs)?
            }
            Command::SetterBail { actor, .. } => {
                engine::setter_bail(game, *actor, now, &self.knobs)?
            }
            Command::FileDispute { actor, turn, .. } => {
                let disputed = tx.lock_turn(*turn).await?.ok_or(Reject::TurnNotFound)?;
                engine::file_dispute(game, &disputed, *actor, now)?
            }
            Command::Resolve {
                dispute,
                actor,
                verdict,
            } => {
                let open = tx
                    .lock_dispute(*dispute)
                    .await?
                    .ok_or(Reject::DisputeNotFound)?;
                engine::resolve_dispute(game, open, *actor, *verdict, now, &self.knobs)?
            }
            Command::Forfeit { actor, .. } => engine::forfeit(game, *actor, now)?,
            Command::Expire { .. } => engine::expire(game, now)?,
            Command::Warn { .. } => {
                engine::warn(game, now, self.warning_window, self.warning_cooldown)?
            }
            Command::Stall { .. } => engine::stall(game, now, &self.knobs)?,
            Command::Create { .. } => unreachable!("handled above"),
        };

        transition
            .game
            .processed_mut()
            .remember(event, self.knobs.dedup_cap);
        tx.update_game(&transition.game).await?;
        if let Some(ref turn) = transition.new_turn {
            tx.insert_turn(turn).await?;
        }
        if let Some(ref update) = transition.judge_update {
            tx.apply_judgment(update).await?;
        }
        let mut dispute = None;
        if let Some(open) = transition.new_dispute.take() {
            let id = tx.insert_dispute(&open).await?;
            dispute = Some(open.with_id(id));
        }
        if let Some(resolved) = transition.resolve_dispute.take() {
            tx.update_dispute(&resolved).await?;
            dispute = Some(resolved);
        }
        if let Some(player) = transition.penalty_to {
            tx.bump_penalty(player).await?;
        }
        tx.commit().await?;
        log::debug!("[game {}] applied {}", target, event);
        Ok(Outcome {
            game: transition.game,
            already_processed: false,
            effects: transition.effects,
            turn: transition.new_turn,
            dispute,
        })
    }
}
