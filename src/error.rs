use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::forms::FormErrors;

#[derive(Debug, Error)]
pub enum AppError {
    // Auth errors
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Unauthorized")]
    Unauthorized,

    // User errors
    #[error("User not found")]
    UserNotFound,
    #[error("User already exists")]
    UserAlreadyExists,

    // Contact errors
    #[error("Contact not found")]
    ContactNotFound,

    // Category errors
    #[error("Category already exists")]
    CategoryAlreadyExists,

    // Validation errors
    #[error("Invalid form submission")]
    Form(FormErrors),
    #[error("Bad request: {0}")]
    BadRequest(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Redis errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    // JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<FormErrors> for AppError {
    fn from(errors: FormErrors) -> Self {
        AppError::Form(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // 400 Bad Request
            AppError::Form(errors) => {
                let body = Json(json!({
                    "error": self.to_string(),
                    "fields": errors,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),

            // 401 Unauthorized
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Jwt(_) => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),

            // 404 Not Found
            AppError::UserNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::ContactNotFound => (StatusCode::NOT_FOUND, self.to_string()),

            // 409 Conflict
            AppError::UserAlreadyExists => (StatusCode::CONFLICT, self.to_string()),
            AppError::CategoryAlreadyExists => (StatusCode::CONFLICT, self.to_string()),

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Cache error".to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Unique constraint violations surface as this SQLSTATE.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FieldError;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn form_errors_render_field_map() {
        let mut errors = FormErrors::default();
        errors.add("password2", FieldError::invalid("passwords do not match"));

        let response = AppError::Form(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid form submission");
        assert_eq!(body["fields"]["password2"][0]["message"], "passwords do not match");
        assert_eq!(body["fields"]["password2"][0]["code"], "invalid");
    }

    #[tokio::test]
    async fn not_found_and_auth_statuses() {
        assert_eq!(
            AppError::ContactNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::TokenExpired.into_response().status(),
            StatusCode::UNAUTHORIZED
        );

        let body = body_json(AppError::InvalidCredentials.into_response()).await;
        assert_eq!(body["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn internal_errors_are_opaque() {
        let response = AppError::Internal(anyhow::anyhow!("bucket missing")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
    }
}
