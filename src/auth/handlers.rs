use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use super::{
    dto::{registered_message, AuthResponse, LoginRequest, RegisterRequest},
    extractors::ApiJson,
    jwt::JwtKeys,
    services,
};
use crate::{error::AppResult, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<&'static str> {
    let role = services::register(state.accounts.as_ref(), payload).await?;
    Ok(registered_message(role))
}

#[instrument(skip(state, keys, payload))]
pub async fn login(
    State(state): State<AppState>,
    State(keys): State<Arc<JwtKeys>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let response = services::login(state.accounts.as_ref(), &keys, payload).await?;
    Ok(Json(response))
}
