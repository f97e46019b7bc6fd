use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};

use super::{handlers, middleware::auth_middleware};
use crate::AppState;

pub const API_PREFIX: &str = "/api/v1";

/// Where a blank search sends the client back to.
pub fn contacts_index_path() -> String {
    format!("{}/contacts", API_PREFIX)
}

pub fn create_router(state: AppState) -> Router<AppState> {
    // Public auth routes
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Protected auth routes
    let auth_protected = Router::new()
        .route("/logout", post(handlers::auth::logout))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // User routes (protected)
    let user_routes = Router::new()
        .route(
            "/me",
            get(handlers::users::get_current_user).put(handlers::users::update_current_user),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Public contact directory
    let contact_public_routes = Router::new()
        .route("/", get(handlers::contacts::index))
        .route("/search", get(handlers::contacts::search))
        .route("/:id", get(handlers::contacts::get_contact));

    // Contact editing (protected, owner only)
    let contact_protected_routes = Router::new()
        .route("/", post(handlers::contacts::create_contact))
        .route(
            "/:id",
            put(handlers::contacts::update_contact)
                .delete(handlers::contacts::delete_contact),
        )
        .route(
            "/:id/picture",
            post(handlers::contacts::upload_picture)
                .layer(DefaultBodyLimit::max(state.config.minio.max_upload_bytes)),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let category_public_routes =
        Router::new().route("/", get(handlers::categories::list_categories));

    let category_protected_routes = Router::new()
        .route("/", post(handlers::categories::create_category))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/auth", auth_routes.merge(auth_protected))
        .nest("/users", user_routes)
        .nest("/contacts", contact_public_routes.merge(contact_protected_routes))
        .nest(
            "/categories",
            category_public_routes.merge(category_protected_routes),
        )
        .with_state(state)
}
