//! # Category Repository

use chrono::Utc;
use comptoir_core::validation::{normalize_optional, validate_name};
use comptoir_core::{Category, CategoryInput};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::new_id;
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// All categories, by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at, updated_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    pub async fn create(&self, input: &CategoryInput) -> DbResult<Category> {
        validate_name("name", &input.name)?;

        let now = Utc::now();
        let category = Category {
            id: new_id(),
            name: input.name.trim().to_string(),
            description: normalize_optional(input.description.as_deref()),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO categories (id, name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    pub async fn update(&self, id: &str, input: &CategoryInput) -> DbResult<Category> {
        validate_name("name", &input.name)?;

        let result = sqlx::query(
            "UPDATE categories SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(input.name.trim())
        .bind(normalize_optional(input.description.as_deref()))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        debug!(id = %id, "Category updated");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Deletes a category. Its products stay, without a category.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE produits SET category_id = NULL WHERE category_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        tx.commit().await?;
        info!(id = %id, "Category deleted");
        Ok(())
    }
}
