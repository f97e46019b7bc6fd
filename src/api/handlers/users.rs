use axum::{extract::State, Extension, Json};

use crate::{
    error::AppResult,
    forms::RegisterUpdateForm,
    models::User,
    services::{auth::Claims, users::UsersService},
    AppState,
};

use super::super::middleware::get_user_id;

pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<User>> {
    let user_id = get_user_id(&claims)?;

    let users_service = UsersService::new(state.db);
    let user = users_service.get_user(user_id).await?;

    Ok(Json(user))
}

pub async fn update_current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(form): Json<RegisterUpdateForm>,
) -> AppResult<Json<User>> {
    let user_id = get_user_id(&claims)?;

    let users_service = UsersService::new(state.db);
    let user = users_service
        .update_profile(user_id, form, state.config.password.hash_cost)
        .await?;

    Ok(Json(user))
}
