//! Auth routes and the bearer check for protected routes

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use contentforge_core::auth::{Session, SignUpOutcome, User};
use serde::Deserialize;
use tracing::debug;

use super::error::ApiError;
use crate::state::{AppState, bearer_token};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let Json(credentials) = payload?;
    let session = state
        .auth_client()?
        .sign_in(&credentials.email, &credentials.password)
        .await?;
    Ok(Json(session))
}

pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<SignUpOutcome>, ApiError> {
    let Json(credentials) = payload?;
    let outcome = state
        .auth_client()?
        .sign_up(&credentials.email, &credentials.password)
        .await?;
    Ok(Json(outcome))
}

pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let Json(request) = payload?;
    let session = state.auth_client()?.refresh(&request.refresh_token).await?;
    Ok(Json(session))
}

pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Unauthenticated)?;
    state.auth_client()?.sign_out(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reject requests without a valid bearer token when auth is required
///
/// The resolved [`User`] is added to the request extensions.
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.require_auth {
        return Ok(next.run(request).await);
    }

    let token = bearer_token(request.headers())
        .ok_or(ApiError::Unauthenticated)?
        .to_string();
    let user: User = state.auth_client()?.get_user(&token).await?;

    debug!(user_id = %user.id, "Authenticated request");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
