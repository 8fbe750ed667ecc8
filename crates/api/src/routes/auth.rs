//! Credential endpoints: register, login, refresh, logout.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use marquee_domain::User;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::context::AppContext;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// POST /api/auth/register
pub async fn register(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let (user, tokens) = ctx.auth_service.register(&body.username, &body.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let tokens = ctx.auth_service.login(&body.username, &body.password).await?;
    Ok(Json(TokenResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let access_token = ctx.auth_service.refresh(&body.refresh_token).await?;
    Ok(Json(RefreshResponse { access_token }))
}

/// POST /api/auth/logout
pub async fn logout(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<RefreshRequest>,
) -> Result<StatusCode, ApiError> {
    ctx.auth_service.logout(&body.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}
