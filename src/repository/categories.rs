//! Book categories repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::category::Category,
};

const CATEGORY_COLUMNS: &str = r#"
    SELECT c.id, c.name, c.created_at,
           (SELECT COUNT(*) FROM books b WHERE b.book_category_id = c.id) AS book_count
    FROM book_categories c
"#;

fn still_has_books(id: i32) -> AppError {
    AppError::BusinessRule(format!("Category with id {} still has books", id))
}

#[derive(Clone)]
pub struct CategoriesRepository {
    pool: Pool<Postgres>,
}

impl CategoriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all categories by name
    pub async fn list(&self) -> AppResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>(&format!("{} ORDER BY c.name", CATEGORY_COLUMNS))
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    /// Get category by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(&format!("{} WHERE c.id = $1", CATEGORY_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }

    /// Check if a category exists
    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM book_categories WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn create(&self, name: &str) -> AppResult<Category> {
        let id: i32 =
            sqlx::query_scalar("INSERT INTO book_categories (name) VALUES ($1) RETURNING id")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::on_unique_violation(e, format!("Category '{}' already exists", name))
                })?;

        self.get_by_id(id).await
    }

    pub async fn rename(&self, id: i32, name: &str) -> AppResult<Category> {
        let result = sqlx::query("UPDATE book_categories SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::on_unique_violation(e, format!("Category '{}' already exists", name))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category with id {} not found", id)));
        }

        self.get_by_id(id).await
    }

    /// Delete a category that no book references
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM book_categories
            WHERE id = $1
              AND NOT EXISTS (SELECT 1 FROM books WHERE book_category_id = $1)
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::on_foreign_key_violation(e, still_has_books(id)))?;

        if result.rows_affected() == 0 {
            return if self.exists(id).await? {
                Err(still_has_books(id))
            } else {
                Err(AppError::NotFound(format!("Category with id {} not found", id)))
            };
        }

        Ok(())
    }
}
