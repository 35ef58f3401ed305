//! Books repository for database operations

use std::time::Duration;

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookInput, BookQuery},
};

const BOOK_COLUMNS: &str = r#"
    SELECT b.id, b.title, b.author, b.price, b.stock, b.book_category_id,
           c.name AS category_name, b.created_at, b.updated_at
    FROM books b
    JOIN book_categories c ON c.id = b.book_category_id
"#;

/// The category vanished after the service checked it
fn missing_category(err: sqlx::Error, category_id: i32) -> AppError {
    AppError::on_foreign_key_violation(
        err,
        AppError::BadRequest(format!("Category with id {} does not exist", category_id)),
    )
}

/// A book can only go once every copy is back on the shelf
fn check_deletable(id: i32, outstanding: i64) -> AppResult<()> {
    if outstanding > 0 {
        return Err(AppError::BusinessRule(format!(
            "Book with id {} is currently borrowed ({} copies out)",
            id, outstanding
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
    transaction_timeout: Duration,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>, transaction_timeout: Duration) -> Self {
        Self {
            pool,
            transaction_timeout,
        }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// List books, optionally filtered by category and a title/author substring
    pub async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut builder = QueryBuilder::<Postgres>::new(BOOK_COLUMNS);
        builder.push(" WHERE 1=1");

        if let Some(category_id) = query.category_id {
            builder.push(" AND b.book_category_id = ").push_bind(category_id);
        }

        if let Some(pattern) = query.search_pattern() {
            builder
                .push(" AND (b.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.author ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder.push(" ORDER BY b.id");

        let books = builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;

        Ok(books)
    }

    /// Create a new book. `book` must already be validated and normalized.
    pub async fn create(&self, book: &BookInput) -> AppResult<Book> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, author, price, stock, book_category_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.price)
        .bind(book.stock)
        .bind(book.book_category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| missing_category(e, book.book_category_id))?;

        self.get_by_id(id).await
    }

    /// Replace every editable field of a book
    pub async fn update(&self, id: i32, book: &BookInput) -> AppResult<Book> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $1, author = $2, price = $3, stock = $4,
                book_category_id = $5, updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.price)
        .bind(book.stock)
        .bind(book.book_category_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| missing_category(e, book.book_category_id))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        self.get_by_id(id).await
    }

    /// Delete a book together with its borrow history.
    ///
    /// Refused with a business-rule error while any user still holds a copy. The book row is locked first so
    /// a concurrent borrow cannot slip in between the check and the delete.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = super::begin_bounded(&self.pool, self.transaction_timeout).await?;

        let locked: Option<i32> = sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        let outstanding: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::bigint FROM current_borrows WHERE book_id = $1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        check_deletable(id, outstanding)?;

        let history = sqlx::query("DELETE FROM borrow_records WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            book_id = id,
            history_rows = history.rows_affected(),
            "Book deleted"
        );

        Ok(())
    }
}
