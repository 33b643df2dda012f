use super::*;
use crate::gateway::Gateway;
use crate::notify::Dispatcher;
use crate::pg;
use crate::reconcile::Reconciler;
use crate::rooms::Fabric;
use actix_cors::Cors;
use actix_web::App;
use actix_web::HttpServer;
use actix_web::middleware::Logger;
use actix_web::web;
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::Client;

/// Everything the handlers share: the gateway (writer), a reader
/// connection for GET paths and scans, the room fabric, and the
/// post-commit effect pipeline.
pub struct Backend {
    pub gateway: Arc<Gateway>,
    pub reader: Arc<Client>,
    pub fabric: Arc<Fabric>,
    pub emitter: Arc<Emitter>,
    pub reconciler: Arc<Reconciler>,
    pub breaker: Breaker,
}

pub struct Server;

impl Server {
    /// Connect, migrate, spawn the in-process reconciler, and serve both
    /// the HTTP surface and the live socket until shutdown.
    pub async fn run(reconcile_every: Duration) -> Result<(), std::io::Error> {
        let writer = pg::connect().await;
        let reader = pg::db().await;
        pg::migrate(&reader).await.expect("schema migration failed");

        let gateway = Arc::new(Gateway::new(writer));
        let fabric = Arc::new(Fabric::shared(reader.clone()));
        let dispatcher = Arc::new(Dispatcher::logging(reader.clone()));
        let emitter = Arc::new(Emitter::new(fabric.clone(), dispatcher));
        let reconciler = Arc::new(Reconciler::new(
            gateway.clone(),
            reader.clone(),
            emitter.clone(),
        ));
        reconciler.clone().spawn(reconcile_every);

        let state = web::Data::new(Backend {
            gateway,
            reader,
            fabric,
            emitter,
            reconciler,
            breaker: Breaker::default(),
        });
        log::info!("starting server");
        HttpServer::new(move || {
            App::new()
                .wrap(Logger::new("%r %s %Ts"))
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header(),
                )
                .app_data(state.clone())
                .route("/games/create", web::post().to(create_game))
                .route("/games/my-games", web::get().to(my_games))
                .route("/games/turns/{turn_id}/judge", web::post().to(judge_turn))
                .route(
                    "/games/disputes/{dispute_id}/resolve",
                    web::post().to(resolve_dispute),
                )
                .route("/games/{id}/respond", web::post().to(respond_game))
                .route("/games/{id}/turns", web::post().to(submit_turn))
                .route("/games/{id}/setter-bail", web::post().to(setter_bail))
                .route("/games/{id}/dispute", web::post().to(file_dispute))
                .route("/games/{id}/forfeit", web::post().to(forfeit_game))
                .route("/games/{id}", web::get().to(game_detail))
                .route("/cron/forfeit-expired-games", web::post().to(forfeit_expired))
                .route("/cron/deadline-warnings", web::post().to(deadline_warnings))
                .route("/cron/cleanup-sessions", web::post().to(cleanup_sessions))
                .route("/ws", web::get().to(socket))
        })
        .workers(4)
        .bind(std::env::var("BIND_ADDR").expect("BIND_ADDR must be set"))?
        .run()
        .await
    }
}
