//! TMDB session flow passthrough, used by the configuration page to link a
//! TMDB account. Responses are never cached.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::external::{RequestToken, SessionId};
use crate::state::AppState;

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/request_token", get(request_token))
        .route("/session_id", get(session_id))
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub request_token: String,
}

pub async fn request_token(State(state): State<AppState>) -> AppResult<Json<RequestToken>> {
    Ok(Json(state.services.addon.request_token().await?))
}

pub async fn session_id(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> AppResult<Json<SessionId>> {
    Ok(Json(
        state.services.addon.session_id(&query.request_token).await?,
    ))
}
