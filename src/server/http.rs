use super::*;
use crate::ID;
use crate::duel::*;
use crate::gateway::Repository;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::http::StatusCode;
use actix_web::web;
use serde_json::json;

/// Status mapping for structured rejections. Conflict-class preconditions
/// are 400s on this API, matching what clients already expect.
pub fn status_of(reject: &Reject) -> StatusCode {
    match reject {
        Reject::GameNotFound
        | Reject::TurnNotFound
        | Reject::DisputeNotFound
        | Reject::OpponentNotFound => StatusCode::NOT_FOUND,
        Reject::Forbidden | Reject::NotAPlayer | Reject::NotRespondent => StatusCode::FORBIDDEN,
        Reject::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        Reject::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Reject::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

pub fn refuse(reject: &Reject) -> HttpResponse {
    if let Reject::Internal(detail) = reject {
        let correlation = uuid::Uuid::now_v7();
        log::error!("[http] internal error {}: {}", correlation, detail);
        return HttpResponse::InternalServerError().json(json!({
            "error": reject.code(),
            "message": reject.message(),
            "correlationId": correlation,
        }));
    }
    HttpResponse::build(status_of(reject)).json(json!({
        "error": reject.code(),
        "message": reject.message(),
    }))
}

pub async fn create_game(
    state: web::Data<Backend>,
    auth: Auth,
    req: web::Json<CreateGameRequest>,
) -> impl Responder {
    let command = Command::create(
        auth.user(),
        auth.username().to_string(),
        req.opponent_id,
        req.event_key.as_deref(),
    );
    match state.gateway.execute(command).await {
        Ok(outcome) => {
            if !outcome.already_processed {
                state.emitter.emit(&outcome.effects).await;
            }
            HttpResponse::Created().json(json!({
                "game": GameView::from(&outcome.game),
                "message": "Challenge sent.",
            }))
        }
        Err(ref reject) => refuse(reject),
    }
}

pub async fn respond_game(
    state: web::Data<Backend>,
    auth: Auth,
    path: web::Path<ID<Game>>,
    req: web::Json<RespondRequest>,
) -> impl Responder {
    let command = Command::Respond {
        game: path.into_inner(),
        actor: auth.user(),
        accept: req.accept,
    };
    match state.gateway.execute(command).await {
        Ok(outcome) => {
            if !outcome.already_processed {
                state.emitter.emit(&outcome.effects).await;
            }
            let message = match req.accept {
                true => "Challenge accepted. Game on.",
                false => "Challenge declined.",
            };
            HttpResponse::Ok().json(json!({
                "game": GameView::from(&outcome.game),
                "message": message,
            }))
        }
        Err(ref reject) => refuse(reject),
    }
}

pub async fn submit_turn(
    state: web::Data<Backend>,
    auth: Auth,
    path: web::Path<ID<Game>>,
    req: web::Json<SubmitTurnRequest>,
) -> impl Responder {
    let command = Command::Submit {
        game: path.into_inner(),
        actor: auth.user(),
        clip: req.clip(),
        key: req.event_key.clone(),
    };
    match state.gateway.execute(command).await {
        Ok(outcome) => {
            if !outcome.already_processed {
                state.emitter.emit(&outcome.effects).await;
            }
            let turn = outcome.turn.as_ref().map(TurnView::from);
            HttpResponse::Created().json(json!({
                "turn": turn,
                "message": "Turn recorded.",
            }))
        }
        Err(ref reject) => refuse(reject),
    }
}

pub async fn judge_turn(
    state: web::Data<Backend>,
    auth: Auth,
    path: web::Path<ID<Turn>>,
    req: web::Json<JudgeRequest>,
) -> impl Responder {
    let turn_id = path.into_inner();
    let command = Command::Judge {
        turn: turn_id,
        actor: auth.user(),
        verdict: req.result,
    };
    match state.gateway.execute(command).await {
        Ok(outcome) => {
            if !outcome.already_processed {
                state.emitter.emit(&outcome.effects).await;
            }
            let turn = match state.reader.fetch_turn(turn_id).await {
                Ok(turn) => turn.map(|t| TurnView::from(&t)),
                Err(_) => None,
            };
            HttpResponse::Ok().json(json!({
                "game": GameView::from(&outcome.game),
                "turn": turn,
                "gameOver": outcome.game_over(),
                "winnerId": outcome.game.winner(),
                "message": match outcome.game_over() {
                    true => "Game over.",
                    false => "Judgment recorded.",
                },
            }))
        }
        Err(ref reject) => refuse(reject),
    }
}

pub async fn setter_bail(
    state: web::Data<Backend>,
    auth: Auth,
    path: web::Path<ID<Game>>,
    req: web::Json<SetterBailRequest>,
) -> impl Responder {
    let command = Command::SetterBail {
        game: path.into_inner(),
        actor: auth.user(),
        key: req.event_key.clone(),
    };
    match state.gateway.execute(command).await {
        Ok(outcome) => {
            if !outcome.already_processed {
                state.emitter.emit(&outcome.effects).await;
            }
            HttpResponse::Ok().json(json!({
                "game": GameView::from(&outcome.game),
                "gameOver": outcome.game_over(),
                "winnerId": outcome.game.winner(),
                "message": match outcome.game_over() {
                    true => "Game over.",
                    false => "Bail taken. Offense changes hands.",
                },
            }))
        }
        Err(ref reject) => refuse(reject),
    }
}

pub async fn file_dispute(
    state: web::Data<Backend>,
    auth: Auth,
    path: web::Path<ID<Game>>,
    req: web::Json<DisputeRequest>,
) -> impl Responder {
    let command = Command::FileDispute {
        game: path.into_inner(),
        actor: auth.user(),
        turn: req.turn_id,
    };
    match state.gateway.execute(command).await {
        Ok(outcome) => {
            if !outcome.already_processed {
                state.emitter.emit(&outcome.effects).await;
            }
            let dispute = outcome.dispute.as_ref().map(DisputeView::from);
            HttpResponse::Created().json(json!({
                "dispute": dispute,
                "message": "Dispute filed. The judger must resolve it.",
            }))
        }
        Err(ref reject) => refuse(reject),
    }
}

pub async fn resolve_dispute(
    state: web::Data<Backend>,
    auth: Auth,
    path: web::Path<i64>,
    req: web::Json<ResolveRequest>,
) -> impl Responder {
    let command = Command::Resolve {
        dispute: path.into_inner(),
        actor: auth.user(),
        verdict: req.final_result,
    };
    match state.gateway.execute(command).await {
        Ok(outcome) => {
            if !outcome.already_processed {
                state.emitter.emit(&outcome.effects).await;
            }
            let dispute = outcome.dispute.as_ref().map(DisputeView::from);
            let penalized = outcome
                .dispute
                .as_ref()
                .and_then(|d| d.penalty_to())
                .map(|p| outcome.game.name_of(p).to_string());
            HttpResponse::Ok().json(json!({
                "dispute": dispute,
                "message": match penalized {
                    Some(name) => format!("Dispute resolved. Penalty applied to {}.", name),
                    None => String::from("Dispute resolved."),
                },
            }))
        }
        Err(ref reject) => refuse(reject),
    }
}

pub async fn forfeit_game(
    state: web::Data<Backend>,
    auth: Auth,
    path: web::Path<ID<Game>>,
) -> impl Responder {
    let command = Command::Forfeit {
        game: path.into_inner(),
        actor: auth.user(),
    };
    match state.gateway.execute(command).await {
        Ok(outcome) => {
            if !outcome.already_processed {
                state.emitter.emit(&outcome.effects).await;
            }
            HttpResponse::Ok().json(json!({
                "game": GameView::from(&outcome.game),
                "message": "Game forfeited.",
            }))
        }
        Err(ref reject) => refuse(reject),
    }
}

/// Listing is a non-critical read: behind an open circuit, or on a store
/// failure, it degrades to an empty board rather than a 5xx.
pub async fn my_games(state: web::Data<Backend>, auth: Auth) -> impl Responder {
    if !state.breaker.allow() {
        return HttpResponse::Ok().json(MyGamesView::partition(auth.user(), &[]));
    }
    match state.reader.games_of(auth.user()).await {
        Ok(games) => {
            state.breaker.success();
            HttpResponse::Ok().json(MyGamesView::partition(auth.user(), &games))
        }
        Err(reject) => {
            state.breaker.failure();
            log::warn!("[http] my-games degraded: {}", reject);
            HttpResponse::Ok().json(MyGamesView::partition(auth.user(), &[]))
        }
    }
}

pub async fn game_detail(
    state: web::Data<Backend>,
    auth: Auth,
    path: web::Path<ID<Game>>,
) -> impl Responder {
    let id = path.into_inner();
    let game = match state.reader.fetch_game(id).await {
        Ok(Some(game)) => game,
        Ok(None) => return refuse(&Reject::GameNotFound),
        Err(ref reject) => return refuse(reject),
    };
    if !game.is_player(auth.user()) {
        return refuse(&Reject::NotAPlayer);
    }
    let turns = match state.reader.turns_of(id).await {
        Ok(turns) => turns,
        Err(ref reject) => return refuse(reject),
    };
    let disputes = match state.reader.disputes_of(id).await {
        Ok(disputes) => disputes,
        Err(ref reject) => return refuse(reject),
    };
    HttpResponse::Ok().json(GameDetailView::assemble(auth.user(), &game, &turns, &disputes))
}
