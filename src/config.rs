use std::env;
use std::time::Duration;

use crate::pagination::DEFAULT_PER_PAGE;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub minio: MinioConfig,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
}

#[derive(Debug, Clone)]
pub struct MinioConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub pictures_bucket: String,
    pub public_url: Option<String>,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_ttl: Duration,
    pub issuer: String,
}

#[derive(Debug, Clone)]
pub struct PasswordConfig {
    pub hash_cost: u32,
}

#[derive(Debug, Clone)]
pub struct PaginationConfig {
    pub per_page: i64,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Config {
            server: ServerConfig {
                host: env_or("SERVER_HOST", "0.0.0.0"),
                port: env_parse("SERVER_PORT", 8080),
                environment: env_or("ENVIRONMENT", "development"),
            },
            database: DatabaseConfig {
                host: env_or("DB_HOST", "localhost"),
                port: env_parse("DB_PORT", 5432),
                user: env_or("DB_USER", "postgres"),
                password: env_or("DB_PASSWORD", "postgres"),
                database: env_or("DB_NAME", "agenda"),
                ssl_mode: env_or("DB_SSL_MODE", "disable"),
                max_connections: env_parse("DB_MAX_CONNS", 25),
            },
            redis: RedisConfig {
                host: env_or("REDIS_HOST", "localhost"),
                port: env_parse("REDIS_PORT", 6379),
                password: env::var("REDIS_PASSWORD").ok(),
                db: env_parse("REDIS_DB", 0),
            },
            minio: MinioConfig {
                endpoint: env_or("MINIO_ENDPOINT", "http://localhost:9000"),
                access_key: env_or("MINIO_ACCESS_KEY", "minioadmin"),
                secret_key: env_or("MINIO_SECRET_KEY", "minioadmin"),
                region: env_or("MINIO_REGION", "us-east-1"),
                pictures_bucket: env_or("MINIO_PICTURES_BUCKET", "pictures"),
                public_url: env::var("MINIO_PUBLIC_URL").ok(),
                max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", 5 * 1024 * 1024),
            },
            jwt: JwtConfig {
                secret: env_or("JWT_SECRET", "super-secret-jwt-key-change-in-production"),
                access_token_ttl: Duration::from_secs(
                    env_parse("JWT_ACCESS_TOKEN_TTL", 24 * 60 * 60), // 1 day
                ),
                issuer: env_or("JWT_ISSUER", "agenda"),
            },
            password: PasswordConfig {
                hash_cost: env_parse("PASSWORD_HASH_COST", bcrypt::DEFAULT_COST),
            },
            pagination: PaginationConfig {
                per_page: env_parse("CONTACTS_PER_PAGE", DEFAULT_PER_PAGE),
            },
        }
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.database.user,
            self.database.password,
            self.database.host,
            self.database.port,
            self.database.database,
            self.database.ssl_mode
        )
    }

    pub fn redis_url(&self) -> String {
        match &self.redis.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.redis.host, self.redis.port, self.redis.db
            ),
            None => format!(
                "redis://{}:{}/{}",
                self.redis.host, self.redis.port, self.redis.db
            ),
        }
    }
}
