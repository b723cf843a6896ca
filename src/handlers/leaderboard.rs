use crate::error::AppError;
use crate::models::leaderboard::{Ranking, ScopeQuery};
use crate::services::leaderboard as service;
use crate::services::{auth, flags};
use crate::state::AppState;
use crate::validation;
use ntex::web::{self, HttpRequest, HttpResponse};
use std::sync::Arc;

fn cookie_header(req: &HttpRequest) -> Option<&str> {
    req.headers().get("cookie").and_then(|v| v.to_str().ok())
}

fn top_board(
    state: &AppState,
    req: &HttpRequest,
    ranking: Ranking,
) -> Result<HttpResponse, AppError> {
    let cfg = flags::require_ranking_config(&state.db)?;
    if ranking.is_weekly() && !cfg.weekly_enabled {
        return Err(AppError::BadRequest("Weekly leaderboard is disabled".into()));
    }
    if cfg.hide_guests {
        auth::verify_session(&state.db, state.session_secret.as_deref(), cookie_header(req))?;
    }
    let board = service::top_board(&state.db, ranking, &cfg)?;
    Ok(HttpResponse::Ok()
        .header("cache-control", service::cache_control(&cfg))
        .json(&board))
}

fn my_board(
    state: &AppState,
    req: &HttpRequest,
    ranking: Ranking,
) -> Result<HttpResponse, AppError> {
    let cfg = flags::require_ranking_config(&state.db)?;
    if ranking.is_weekly() && !cfg.weekly_enabled {
        return Err(AppError::BadRequest("Weekly leaderboard is disabled".into()));
    }
    let user = auth::verify_session(&state.db, state.session_secret.as_deref(), cookie_header(req))?;
    let me = service::my_board(&state.db, ranking, &user.id)?;
    Ok(HttpResponse::Ok()
        .header("cache-control", "private, no-store")
        .json(&me))
}

pub async fn coins_top(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    query: web::types::Query<ScopeQuery>,
) -> Result<HttpResponse, AppError> {
    let ranking = validation::parse_coins_scope(query.scope.as_deref())?;
    top_board(&state, &req, ranking)
}

pub async fn coins_me(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    my_board(&state, &req, Ranking::CoinsAll)
}

pub async fn level_top(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    query: web::types::Query<ScopeQuery>,
) -> Result<HttpResponse, AppError> {
    let ranking = validation::parse_level_scope(query.scope.as_deref())?;
    top_board(&state, &req, ranking)
}

pub async fn level_me(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    query: web::types::Query<ScopeQuery>,
) -> Result<HttpResponse, AppError> {
    let ranking = validation::parse_level_scope(query.scope.as_deref())?;
    my_board(&state, &req, ranking)
}
