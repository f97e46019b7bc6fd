use std::sync::OnceLock;

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::{Config, JwtConfig},
    error::{is_unique_violation, AppError, AppResult},
    forms::{NewAccount, RegisterForm},
    models::{AccessToken, User},
    services::users::UsersService,
    storage::redis::RedisClient,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user_id
    pub jti: String, // token id, used for revocation
    pub iss: String, // issuer
    pub exp: i64,    // expiry
    pub iat: i64,    // issued at
}

pub struct AuthService {
    db: PgPool,
    redis: RedisClient,
    config: Config,
}

impl AuthService {
    pub fn new(db: PgPool, redis: RedisClient, config: Config) -> Self {
        Self { db, redis, config }
    }

    // User Registration
    pub async fn register(&self, form: RegisterForm) -> AppResult<(User, AccessToken)> {
        let users = UsersService::new(self.db.clone());
        let account = form.clean(&users).await?;

        let user = self.save_account(account).await?;
        tracing::info!("Registered user {}", user.username);

        let token = issue_token(&self.config.jwt, user.id)?;
        Ok((user, token))
    }

    async fn save_account(&self, account: NewAccount) -> AppResult<User> {
        let password_hash = hash_password(&account.password, self.config.password.hash_cost)?;

        sqlx::query_as(
            r#"
            INSERT INTO users (id, username, email, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::UserAlreadyExists
            } else {
                AppError::Database(e)
            }
        })
    }

    // User Login
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(User, AccessToken)> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
            .bind(username.trim())
            .fetch_optional(&self.db)
            .await?;

        // Unknown usernames still pay for a bcrypt check
        let Some(user) = user else {
            let _ = verify_password(password, dummy_hash(self.config.password.hash_cost)?)?;
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!("Failed login for {}", user.username);
            return Err(AppError::InvalidCredentials);
        }

        let token = issue_token(&self.config.jwt, user.id)?;
        Ok((user, token))
    }

    // Token validation
    pub async fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let claims = decode_token(&self.config.jwt, token)?;

        if self.redis.is_token_revoked(&claims.jti).await? {
            return Err(AppError::InvalidToken);
        }

        Ok(claims)
    }

    // Logout
    pub async fn logout(&self, claims: &Claims) -> AppResult<()> {
        let remaining = (claims.exp - Utc::now().timestamp()).max(0) as u64;
        self.redis
            .revoke_token(&claims.jti, std::time::Duration::from_secs(remaining))
            .await?;

        Ok(())
    }
}

pub fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let hashed = hash(password, cost).map_err(|e| anyhow::anyhow!("Hash error: {}", e))?;
    Ok(hashed)
}

/// A hash no password is checked against successfully, built once per process.
fn dummy_hash(cost: u32) -> AppResult<&'static str> {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();

    if let Some(hashed) = DUMMY_HASH.get() {
        return Ok(hashed.as_str());
    }
    let hashed = hash_password(&Uuid::new_v4().to_string(), cost)?;
    Ok(DUMMY_HASH.get_or_init(|| hashed).as_str())
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let valid =
        verify(password, password_hash).map_err(|e| anyhow::anyhow!("Verify error: {}", e))?;
    Ok(valid)
}

pub fn issue_token(jwt: &JwtConfig, user_id: Uuid) -> AppResult<AccessToken> {
    let now = Utc::now();
    let expires_at = now + Duration::seconds(jwt.access_token_ttl.as_secs() as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iss: jwt.issuer.clone(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let key = EncodingKey::from_secret(jwt.secret.as_bytes());
    let access_token = encode(&Header::default(), &claims, &key)?;

    Ok(AccessToken {
        access_token,
        token_type: "Bearer".to_string(),
        expires_at,
    })
}

pub fn decode_token(jwt: &JwtConfig, token: &str) -> AppResult<Claims> {
    let key = DecodingKey::from_secret(jwt.secret.as_bytes());
    let mut validation = Validation::default();
    validation.set_issuer(&[jwt.issuer.as_str()]);

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::Jwt(e),
        })
}
