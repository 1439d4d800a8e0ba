//! Account endpoints: signup, login and the public user listing.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use services::{AuthSession, LoginRequest, SignupRequest};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthSession>), ApiError> {
    let Json(request) = body?;
    let session = state.users.signup(request).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthSession>, ApiError> {
    let Json(request) = body?;
    Ok(Json(state.users.login(request).await?))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let users = state.users.list().await?;
    Ok(Json(json!({ "users": users })))
}
