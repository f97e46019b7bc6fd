use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::AppResult,
    forms::{clean_text, FormErrors},
    models::Category,
    services::categories::CategoriesService,
    AppState,
};

pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    let categories_service = CategoriesService::new(state.db);
    let categories = categories_service.list_categories().await?;

    Ok(Json(categories))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(
        required(message = "This field is required."),
        length(max = 50, message = "Ensure this value has at most 50 characters.")
    )]
    pub name: Option<String>,
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let req = CreateCategoryRequest {
        name: clean_text(req.name),
    };
    FormErrors::from_validation(req.validate()).check()?;

    let categories_service = CategoriesService::new(state.db);
    let category = categories_service
        .create_category(req.name.as_deref().unwrap_or_default())
        .await?;

    Ok((StatusCode::CREATED, Json(category)))
}
