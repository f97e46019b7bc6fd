use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    services::auth::{AuthService, Claims},
    AppState,
};

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::Unauthorized)?;

    let auth_service = AuthService::new(
        state.db.clone(),
        state.redis.clone(),
        (*state.config).clone(),
    );

    let claims = auth_service.validate_token(bearer.token()).await?;

    // Insert claims into request extensions
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Extract user_id from request extensions
pub fn get_user_id(claims: &Claims) -> AppResult<Uuid> {
    Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)
}
