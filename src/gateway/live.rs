use super::Gateway;
use super::Repository;
use crate::Unique;
use crate::duel::Reject;
use crate::live::*;
use crate::live::engine;
use crate::live::engine::LiveEffect;
use crate::live::engine::LiveTransition;
use std::time::SystemTime;
use tokio_postgres::IsolationLevel;

/// Result of one accepted (or deduplicated) live command.
#[derive(Debug)]
pub struct LiveOutcome {
    pub session: LiveSession,
    pub already_processed: bool,
    pub effects: Vec<LiveEffect>,
}

impl LiveOutcome {
    fn replayed(session: LiveSession) -> Self {
        Self {
            session,
            already_processed: true,
            effects: Vec::new(),
        }
    }
    fn fresh(transition: LiveTransition) -> Self {
        Self {
            session: transition.session,
            already_processed: false,
            effects: transition.effects,
        }
    }
}

impl Gateway {
    /// Same envelope as [`Gateway::execute`], over `game_sessions` rows.
    pub async fn execute_live(&self, command: LiveCommand) -> Result<LiveOutcome, Reject> {
        let now = SystemTime::now();
        let knobs = *self.live_knobs();
        let mut client = self.writer().await;
        let target = command.session();
        let tx = client
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .await?;

        if let LiveCommand::Create {
            session,
            spot,
            creator,
            creator_name,
            max_players,
        } = &command
        {
            tx.ensure_profile(*creator, creator_name).await?;
            let transition = engine::create(
                *session,
                spot.clone(),
                *creator,
                creator_name.clone(),
                *max_players,
                now,
            )?;
            let mut fresh = transition.session;
            let event_id = command.event_id(&fresh);
            fresh.processed_mut().remember(event_id, knobs.dedup_cap);
            tx.insert_session(&fresh).await?;
            tx.commit().await?;
            log::info!("[live {}] opened at {} by {}", fresh.id(), fresh.spot(), creator);
            return Ok(LiveOutcome {
                session: fresh,
                already_processed: false,
                effects: transition.effects,
            });
        }

        let session = tx
            .lock_session(target)
            .await?
            .ok_or(Reject::GameNotFound)?;
        let event = command.event_id(&session);
        if session.processed().contains(event) {
            tx.commit().await?;
            log::debug!("[live {}] event {} already processed", target, event);
            return Ok(LiveOutcome::replayed(session));
        }

        let mut transition = match &command {
            LiveCommand::Join { player, name, .. } => {
                tx.ensure_profile(*player, name).await?;
                engine::join(session, *player, name.clone(), now, &knobs)?
            }
            LiveCommand::Trick {
                actor,
                trick_name,
                clip_url,
                ..
            } => engine::trick(
                session,
                *actor,
                trick_name.clone(),
                clip_url.clone(),
                now,
                &knobs,
            )?,
            LiveCommand::Pass { actor, .. } => engine::pass(session, *actor, now, &knobs)?,
            LiveCommand::Forfeit { actor, .. } => engine::forfeit(session, *actor, now)?,
            LiveCommand::Disconnect { actor, .. } => {
                engine::disconnect(session, *actor, now, &knobs)?
            }
            LiveCommand::Reconnect { actor, .. } => {
                engine::reconnect(session, *actor, now, &knobs)?
            }
            LiveCommand::Expire { .. } => engine::expire(session, now)?,
            LiveCommand::ReconnectTimeout { player, .. } => {
                engine::reconnect_timeout(session, *player, now, &knobs)?
            }
            LiveCommand::Create { .. } => unreachable!("handled above"),
        };

        transition
            .session
            .processed_mut()
            .remember(event, knobs.dedup_cap);
        tx.update_session(&transition.session).await?;
        tx.commit().await?;
        log::debug!("[live {}] applied {}", target, event);
        Ok(LiveOutcome::fresh(transition))
    }
}
