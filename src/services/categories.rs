use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{is_unique_violation, AppError, AppResult},
    forms::CategoryLookup,
    models::Category,
};

pub struct CategoriesService {
    db: PgPool,
}

impl CategoriesService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories: Vec<Category> =
            sqlx::query_as("SELECT * FROM categories ORDER BY name, id")
                .fetch_all(&self.db)
                .await?;

        Ok(categories)
    }

    pub async fn get_category(&self, id: Uuid) -> AppResult<Option<Category>> {
        let category: Option<Category> = sqlx::query_as("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(category)
    }

    pub async fn create_category(&self, name: &str) -> AppResult<Category> {
        sqlx::query_as("INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING *")
            .bind(Uuid::new_v4())
            .bind(name)
            .fetch_one(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::CategoryAlreadyExists
                } else {
                    AppError::Database(e)
                }
            })
    }
}

#[async_trait]
impl CategoryLookup for CategoriesService {
    async fn category_exists(&self, id: Uuid) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.db)
                .await?;

        Ok(exists)
    }
}
