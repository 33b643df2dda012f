use super::Auth;
use super::Backend;
use super::status_of;
use crate::ID;
use crate::OP_TIMEOUT_SECS;
use crate::Unique;
use crate::duel::PlayerId;
use crate::duel::Reject;
use crate::gateway::LiveOutcome;
use crate::live::*;
use crate::rooms::PresenceStore;
use crate::rooms::RoomKey;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use futures::StreamExt;
use std::time::Duration;
use std::time::Instant;

/// Upgrade `GET /ws` and run the bridge for the socket's lifetime.
pub async fn socket(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<Backend>,
    auth: Auth,
) -> impl Responder {
    match actix_ws::handle(&req, body) {
        Ok((response, session, stream)) => {
            actix_web::rt::spawn(bridge(state, auth, session, stream));
            response.map_into_left_body()
        }
        Err(e) => HttpResponse::InternalServerError()
            .body(e.to_string())
            .map_into_right_body(),
    }
}

/// Pump both directions until either side drops: room traffic out through
/// the fabric channel, client events in through the gateway. Teardown
/// marks presence offline and lets the pause machinery know.
async fn bridge(
    state: web::Data<Backend>,
    auth: Auth,
    mut session: actix_ws::Session,
    mut stream: actix_ws::MessageStream,
) {
    let user = auth.user();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let socket = state.fabric.attach(user, tx).await;
    let _ = state.fabric.join(&RoomKey::user(user), user).await;
    let _ = state.fabric.join(&RoomKey::global(), user).await;
    if let Err(e) = state.reader.set_presence(user, PresenceStatus::Online).await {
        log::warn!("[ws {}] presence set failed: {}", user, e);
    }
    log::info!("[ws {}] connected", user);

    let mut limits = RateLimits::default();
    let mut joined: Vec<ID<LiveSession>> = Vec::new();
    'sesh: loop {
        tokio::select! {
            biased;
            msg = rx.recv() => match msg {
                Some(json) => if session.text(json).await.is_err() { break 'sesh },
                None => break 'sesh,
            },
            msg = stream.next() => match msg {
                Some(Ok(actix_ws::Message::Text(text))) => {
                    if let Some(reply) =
                        handle(&state, &auth, &text, &mut limits, &mut joined).await
                    {
                        if session.text(reply).await.is_err() {
                            break 'sesh;
                        }
                    }
                }
                Some(Ok(actix_ws::Message::Close(_))) => break 'sesh,
                Some(Err(_)) => break 'sesh,
                None => break 'sesh,
                _ => continue 'sesh,
            },
        }
    }

    state.fabric.detach(user, socket).await;
    state.fabric.leave(&RoomKey::user(user), user).await;
    state.fabric.leave(&RoomKey::global(), user).await;
    if let Err(e) = state.reader.set_presence(user, PresenceStatus::Offline).await {
        log::warn!("[ws {}] presence clear failed: {}", user, e);
    }
    for game in joined {
        drop_from_session(&state, game, user).await;
        state.fabric.leave(&RoomKey::game(game), user).await;
    }
    log::info!("[ws {}] closed", user);
}

/// One inbound frame: parse strictly, rate-limit, run the gateway command
/// under the operation timeout, emit effects. The return value is an
/// error/ack frame for this socket only.
async fn handle(
    state: &web::Data<Backend>,
    auth: &Auth,
    text: &str,
    limits: &mut RateLimits,
    joined: &mut Vec<ID<LiveSession>>,
) -> Option<String> {
    let user = auth.user();
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            return Some(ServerMessage::error("VALIDATION", &e.to_string()).to_json());
        }
    };
    if !limits.allow(message.event(), Instant::now()) {
        let reject = Reject::RateLimited;
        return Some(ServerMessage::error(reject.code(), &reject.message()).to_json());
    }
    if let Err(e) = state.reader.touch_presence(user).await {
        log::debug!("[ws {}] presence touch failed: {}", user, e);
    }

    let command = match message {
        ClientMessage::Create {
            spot_id,
            max_players,
        } => LiveCommand::Create {
            session: ID::default(),
            spot: spot_id,
            creator: user,
            creator_name: auth.username().to_string(),
            max_players,
        },
        ClientMessage::Join { game_id } => LiveCommand::Join {
            session: game_id,
            player: user,
            name: auth.username().to_string(),
        },
        ClientMessage::Trick {
            game_id,
            trick_name,
            clip_url,
        } => LiveCommand::Trick {
            session: game_id,
            actor: user,
            trick_name,
            clip_url,
        },
        ClientMessage::Pass { game_id } => LiveCommand::Pass {
            session: game_id,
            actor: user,
        },
        ClientMessage::Forfeit { game_id } => LiveCommand::Forfeit {
            session: game_id,
            actor: user,
        },
        ClientMessage::Reconnect { game_id } => LiveCommand::Reconnect {
            session: game_id,
            actor: user,
        },
        ClientMessage::Presence { status } => {
            if let Err(e) = state.reader.set_presence(user, status).await {
                log::warn!("[ws {}] presence update failed: {}", user, e);
            }
            state
                .emitter
                .broadcast(
                    &RoomKey::global(),
                    &ServerMessage::presence(user, status).to_json(),
                )
                .await;
            return None;
        }
    };

    match run(state, command).await {
        Ok(outcome) => {
            let id = outcome.session.id();
            match joined.contains(&id) {
                true => {}
                false => {
                    // membership follows session participation
                    if outcome.session.is_player(user) {
                        let _ = state.fabric.join(&RoomKey::game(id), user).await;
                        let _ = state
                            .fabric
                            .join(&RoomKey::spot(outcome.session.spot()), user)
                            .await;
                        joined.push(id);
                    }
                }
            }
            if !outcome.already_processed {
                state.emitter.emit_live(&outcome.effects).await;
            }
            if outcome.session.status().terminal()
                || !outcome.session.is_player(user)
            {
                state.fabric.leave(&RoomKey::game(id), user).await;
                joined.retain(|g| *g != id);
            }
            None
        }
        Err(reject) => {
            log::debug!(
                "[ws {}] rejected ({}): {}",
                user,
                status_of(&reject),
                reject.code()
            );
            Some(ServerMessage::error(reject.code(), &reject.message()).to_json())
        }
    }
}

/// Operation-level timeout around the transactional call. On expiry the
/// caller sees a structured error; retries must reuse the same intent so
/// the event ID lines up.
async fn run(
    state: &web::Data<Backend>,
    command: LiveCommand,
) -> Result<LiveOutcome, Reject> {
    let budget = Duration::from_secs(crate::env_u64("OP_TIMEOUT_SECS", OP_TIMEOUT_SECS));
    match tokio::time::timeout(budget, state.gateway.execute_live(command)).await {
        Ok(result) => result,
        Err(_) => Err(Reject::Unavailable(String::from("operation timed out"))),
    }
}

/// Socket teardown invokes the pause machinery for every session this
/// socket was playing in. Sessions that were waiting or already over
/// reject with WrongPhase, which is the expected quiet path.
pub async fn drop_from_session(
    state: &web::Data<Backend>,
    session: ID<LiveSession>,
    user: PlayerId,
) {
    match state
        .gateway
        .execute_live(LiveCommand::Disconnect {
            session,
            actor: user,
        })
        .await
    {
        Ok(outcome) if !outcome.already_processed => {
            state.emitter.emit_live(&outcome.effects).await;
        }
        Ok(_) => {}
        Err(Reject::WrongPhase) | Err(Reject::NotAPlayer) => {}
        Err(e) => log::warn!("[ws] drop {} from {} failed: {}", user, session, e),
    }
}
