//! Users repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{User, UserInput},
};

const USER_COLUMNS: &str = r#"
    SELECT u.id, u.name, u.email, u.created_at,
           (SELECT COALESCE(SUM(cb.quantity), 0)::bigint
            FROM current_borrows cb WHERE cb.user_id = u.id) AS borrowed_count
    FROM users u
"#;

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all users
    pub async fn list(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!("{} ORDER BY u.id", USER_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("{} WHERE u.id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Create a user. The email must be unique.
    pub async fn create(&self, user: &UserInput) -> AppResult<User> {
        let id: i32 = sqlx::query_scalar("INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id")
            .bind(&user.name)
            .bind(&user.email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::on_unique_violation(e, format!("Email {} is already in use", user.email)))?;

        self.get_by_id(id).await
    }

    pub async fn update(&self, id: i32, user: &UserInput) -> AppResult<User> {
        let result = sqlx::query("UPDATE users SET name = $1, email = $2 WHERE id = $3")
            .bind(&user.name)
            .bind(&user.email)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::on_unique_violation(e, format!("Email {} is already in use", user.email)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        self.get_by_id(id).await
    }
}
