use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{is_unique_violation, AppError, AppResult},
    forms::{AccountLookup, RegisterUpdateForm},
    models::User,
    services::auth::hash_password,
};

pub struct UsersService {
    db: PgPool,
}

impl UsersService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        user.ok_or(AppError::UserNotFound)
    }

    /// Apply a profile edit, rotating the password hash when a new password
    /// was supplied.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        form: RegisterUpdateForm,
        hash_cost: u32,
    ) -> AppResult<User> {
        let user = self.get_user(user_id).await?;
        let changes = form.clean(self, &user).await?;

        let password_hash = changes
            .password
            .as_deref()
            .map(|password| hash_password(password, hash_cost))
            .transpose()?;

        let updated: User = sqlx::query_as(
            r#"
            UPDATE users
            SET username = $1,
                email = $2,
                first_name = $3,
                last_name = $4,
                password_hash = COALESCE($5, password_hash),
                updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&password_hash)
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::UserAlreadyExists
            } else {
                AppError::Database(e)
            }
        })?;

        if password_hash.is_some() {
            tracing::info!("Password changed for user {}", updated.username);
        }

        Ok(updated)
    }
}

#[async_trait]
impl AccountLookup for UsersService {
    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        Ok(taken)
    }

    async fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        Ok(taken)
    }
}
