use actix_web::{web, App, HttpServer};
use quantum_chat_service::{
    config, db, error, logging, routes,
    services::{CallCoordinator, S3AssetStore},
    state::AppState,
    store::PostgresStore,
    websocket::PresenceRegistry,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let pool = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;
    let store = Arc::new(PostgresStore::new(pool));

    let assets = Arc::new(S3AssetStore::from_config(&cfg.s3).await);

    let registry = PresenceRegistry::new();
    let calls = CallCoordinator::new(
        registry.clone(),
        Duration::from_millis(cfg.call_reject_reset_ms),
    );

    let state = AppState {
        store: store.clone(),
        users: store,
        assets,
        registry,
        calls,
        config: cfg.clone(),
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting quantum-chat-service");

    let cors_origins = cfg.cors_origins.clone();
    HttpServer::new(move || {
        let mut cors = actix_cors::Cors::default()
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);
        for origin in &cors_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .service(routes::messages::get_peers)
            .service(routes::messages::send_message)
            .service(routes::messages::mark_message_seen)
            .service(routes::messages::get_messages)
            .service(routes::rtc::get_ice_config)
            .service(routes::wsroute::ws_handler)
            .route("/health", web::get().to(|| async { "OK" }))
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("run server: {e}")))
}
