mod db;
mod error;
mod handlers;
mod models;
mod services;
mod state;
mod validation;

use db::Db;
use ntex::web;
use ntex_cors::Cors;
use state::AppState;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[ntex::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let db_path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| "brainwave.db".into());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);
    let session_secret = std::env::var("SESSION_SECRET").ok();
    if session_secret.is_none() {
        tracing::warn!("SESSION_SECRET is not set; authenticated endpoints will answer 401");
    }

    let db = Db::open(&db_path).expect("Failed to open database");
    let app_state = Arc::new(AppState::new(db, session_secret));

    info!(%host, port, "Brainwave server starting");

    web::HttpServer::new(move || {
        web::App::new()
            .state(app_state.clone())
            .wrap(
                Cors::new()
                    .allowed_origin("*")
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec!["Content-Type"])
                    .max_age(3600)
                    .finish(),
            )
            // Health check
            .route("/api/health", web::get().to(health))
            // Game session results
            .route("/api/sessions", web::post().to(handlers::play::submit_session))
            // Leaderboards
            .route(
                "/api/leaderboard/coins",
                web::get().to(handlers::leaderboard::coins_top),
            )
            .route(
                "/api/leaderboard/coins/me",
                web::get().to(handlers::leaderboard::coins_me),
            )
            .route(
                "/api/leaderboard/level",
                web::get().to(handlers::leaderboard::level_top),
            )
            .route(
                "/api/leaderboard/level/me",
                web::get().to(handlers::leaderboard::level_me),
            )
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}

async fn health() -> web::HttpResponse {
    web::HttpResponse::Ok().json(&serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
