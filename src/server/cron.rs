use super::Backend;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use serde_json::json;

/// Cron endpoints are driven by the external scheduler and must present
/// the shared secret. Without a configured secret they stay closed.
fn authorized(req: &HttpRequest) -> bool {
    let Some(secret) = crate::cron_secret() else {
        return false;
    };
    req.headers()
        .get("x-cron-secret")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == secret)
        .unwrap_or(false)
}

pub async fn forfeit_expired(state: web::Data<Backend>, req: HttpRequest) -> impl Responder {
    if !authorized(&req) {
        return HttpResponse::Unauthorized().body("bad cron secret");
    }
    let forfeited = state.reconciler.sweep_deadlines().await + state.reconciler.sweep_stalled().await;
    HttpResponse::Ok().json(json!({ "forfeited": forfeited }))
}

pub async fn deadline_warnings(state: web::Data<Backend>, req: HttpRequest) -> impl Responder {
    if !authorized(&req) {
        return HttpResponse::Unauthorized().body("bad cron secret");
    }
    let notified = state.reconciler.sweep_warnings().await;
    HttpResponse::Ok().json(json!({ "notified": notified }))
}

pub async fn cleanup_sessions(state: web::Data<Backend>, req: HttpRequest) -> impl Responder {
    if !authorized(&req) {
        return HttpResponse::Unauthorized().body("bad cron secret");
    }
    let deleted = state.reconciler.cleanup().await;
    HttpResponse::Ok().json(json!({ "deleted": deleted }))
}
