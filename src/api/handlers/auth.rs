use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    forms::RegisterForm,
    models::{AccessToken, User},
    services::auth::{AuthService, Claims},
    AppState,
};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: AccessToken,
}

pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let auth_service = AuthService::new(state.db, state.redis, (*state.config).clone());
    let (user, token) = auth_service.register(form).await?;

    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let auth_service = AuthService::new(state.db, state.redis, (*state.config).clone());
    let (user, token) = auth_service.login(&req.username, &req.password).await?;

    Ok(Json(AuthResponse { user, token }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<MessageResponse>> {
    let auth_service = AuthService::new(state.db, state.redis, (*state.config).clone());
    auth_service.logout(&claims).await?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}
