use crate::error::AppError;
use crate::models::play::SessionSubmission;
use crate::services::{auth, play as service};
use crate::state::AppState;
use ntex::web::{self, HttpRequest, HttpResponse};
use std::sync::Arc;

pub async fn submit_session(
    state: web::types::State<Arc<AppState>>,
    req: HttpRequest,
    body: web::types::Json<SessionSubmission>,
) -> Result<HttpResponse, AppError> {
    let cookie = req.headers().get("cookie").and_then(|v| v.to_str().ok());
    let user = auth::verify_session(&state.db, state.session_secret.as_deref(), cookie)?;
    let result = service::record_session(&state.db, &user, body.into_inner())?;
    Ok(HttpResponse::Ok().json(&result))
}
