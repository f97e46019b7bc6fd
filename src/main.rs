use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod forms;
mod models;
mod pagination;
mod services;
mod storage;

use api::router::API_PREFIX;
use config::Config;
use storage::{minio::MinioClient, redis::RedisClient};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub redis: RedisClient,
    pub minio: MinioClient,
    pub config: Arc<Config>,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest(API_PREFIX, api::router::create_router(state.clone()))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load();
    tracing::info!("Starting server in {} mode", config.server.environment);

    // Initialize database pool
    let db = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database_url())
        .await?;
    tracing::info!("Connected to PostgreSQL");

    // Run migrations
    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!("Database migrations completed");

    // Initialize Redis
    let redis = RedisClient::new(&config.redis_url())?;
    redis.connection().await?;
    tracing::info!("Connected to Redis");

    // Initialize MinIO
    let minio = MinioClient::new(&config.minio);
    minio.ensure_buckets().await?;
    tracing::info!("Connected to MinIO");

    // Create app state
    let state = AppState {
        db,
        redis,
        minio,
        config: Arc::new(config.clone()),
    };

    let app = build_app(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
