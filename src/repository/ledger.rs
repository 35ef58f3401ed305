//! Lending ledger repository.
//!
//! Borrow and return each run as one transaction that appends an audit record,
//! moves the outstanding-loan row and adjusts the book's stock. The book row is
//! locked `FOR UPDATE` before anything is checked, so concurrent calls on the
//! same book queue up behind each other instead of reading stale stock.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::borrow::{
        check_borrow, plan_return, BorrowAction, BorrowReceipt, BorrowRecord, BorrowRecordQuery,
        CurrentBorrow, LedgerCommand, LedgerRequest, ReturnPlan,
    },
};

/// Transactional borrow/return operations.
///
/// Unknown books and users are reported before the quantity is checked.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Lend `quantity` copies of a book to a user
    async fn borrow(&self, request: LedgerRequest) -> AppResult<BorrowReceipt>;
    /// Take back `quantity` copies of a book from a user
    async fn return_books(&self, request: LedgerRequest) -> AppResult<BorrowReceipt>;
    /// Audit history matching the filters, newest first
    async fn records(&self, query: BorrowRecordQuery) -> AppResult<Vec<BorrowRecord>>;
}

#[derive(Clone)]
pub struct LedgerRepository {
    pool: Pool<Postgres>,
    transaction_timeout: Duration,
}

impl LedgerRepository {
    pub fn new(pool: Pool<Postgres>, transaction_timeout: Duration) -> Self {
        Self {
            pool,
            transaction_timeout,
        }
    }

    /// Outstanding loans of a user, with book title and author
    pub async fn current_borrows_for_user(&self, user_id: i32) -> AppResult<Vec<CurrentBorrow>> {
        let rows = sqlx::query_as::<_, CurrentBorrow>(
            r#"
            SELECT cb.id, cb.user_id, cb.book_id, cb.quantity, cb.updated_at,
                   b.title AS book_title, b.author AS book_author
            FROM current_borrows cb
            JOIN books b ON b.id = cb.book_id
            WHERE cb.user_id = $1
            ORDER BY cb.book_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lock the book row and return its stock
    async fn lock_book(tx: &mut Transaction<'static, Postgres>, book_id: i32) -> AppResult<i32> {
        sqlx::query_scalar::<_, i32>("SELECT stock FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    async fn ensure_user(tx: &mut Transaction<'static, Postgres>, user_id: i32) -> AppResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut **tx)
            .await?;

        if !exists {
            return Err(AppError::NotFound(format!("User with id {} not found", user_id)));
        }
        Ok(())
    }

    async fn append_record(
        tx: &mut Transaction<'static, Postgres>,
        command: &LedgerCommand,
        action: BorrowAction,
    ) -> AppResult<BorrowRecord> {
        let record = sqlx::query_as::<_, BorrowRecord>(
            r#"
            INSERT INTO borrow_records (user_id, book_id, action, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, book_id, action, quantity, created_at
            "#,
        )
        .bind(command.user_id)
        .bind(command.book_id)
        .bind(action.as_str())
        .bind(command.quantity)
        .fetch_one(&mut **tx)
        .await?;

        Ok(record)
    }

    /// Add `delta` copies to the book's stock and return the new value
    async fn adjust_stock(
        tx: &mut Transaction<'static, Postgres>,
        book_id: i32,
        delta: i32,
    ) -> AppResult<i32> {
        let stock: i32 = sqlx::query_scalar(
            "UPDATE books SET stock = stock + $1, updated_at = NOW() WHERE id = $2 RETURNING stock",
        )
        .bind(delta)
        .bind(book_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(stock)
    }
}

#[async_trait]
impl LedgerStore for LedgerRepository {
    async fn borrow(&self, request: LedgerRequest) -> AppResult<BorrowReceipt> {
        let mut tx = super::begin_bounded(&self.pool, self.transaction_timeout).await?;

        let stock = Self::lock_book(&mut tx, request.book_id).await?;
        Self::ensure_user(&mut tx, request.user_id).await?;
        let command = LedgerCommand::try_from(request)?;
        check_borrow(stock, command.quantity)?;

        let record = Self::append_record(&mut tx, &command, BorrowAction::Borrow).await?;

        let outstanding: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO current_borrows (user_id, book_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, book_id)
            DO UPDATE SET quantity = current_borrows.quantity + EXCLUDED.quantity,
                          updated_at = NOW()
            RETURNING quantity
            "#,
        )
        .bind(command.user_id)
        .bind(command.book_id)
        .bind(command.quantity)
        .fetch_one(&mut *tx)
        .await?;

        let stock = Self::adjust_stock(&mut tx, command.book_id, -command.quantity).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = command.user_id,
            book_id = command.book_id,
            quantity = command.quantity,
            stock,
            outstanding,
            "Books borrowed"
        );

        Ok(BorrowReceipt {
            record,
            stock,
            outstanding,
        })
    }

    async fn return_books(&self, request: LedgerRequest) -> AppResult<BorrowReceipt> {
        let mut tx = super::begin_bounded(&self.pool, self.transaction_timeout).await?;

        Self::lock_book(&mut tx, request.book_id).await?;
        Self::ensure_user(&mut tx, request.user_id).await?;
        let command = LedgerCommand::try_from(request)?;

        let held: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM current_borrows WHERE user_id = $1 AND book_id = $2 FOR UPDATE",
        )
        .bind(command.user_id)
        .bind(command.book_id)
        .fetch_optional(&mut *tx)
        .await?;

        let plan = plan_return(held, command.quantity)?;

        let record = Self::append_record(&mut tx, &command, BorrowAction::Return).await?;

        match plan {
            ReturnPlan::Remove => {
                sqlx::query("DELETE FROM current_borrows WHERE user_id = $1 AND book_id = $2")
                    .bind(command.user_id)
                    .bind(command.book_id)
                    .execute(&mut *tx)
                    .await?;
            }
            ReturnPlan::Decrement { remaining } => {
                sqlx::query(
                    r#"
                    UPDATE current_borrows SET quantity = $1, updated_at = NOW()
                    WHERE user_id = $2 AND book_id = $3
                    "#,
                )
                .bind(remaining)
                .bind(command.user_id)
                .bind(command.book_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        let stock = Self::adjust_stock(&mut tx, command.book_id, command.quantity).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = command.user_id,
            book_id = command.book_id,
            quantity = command.quantity,
            stock,
            outstanding = plan.remaining(),
            "Books returned"
        );

        Ok(BorrowReceipt {
            record,
            stock,
            outstanding: plan.remaining(),
        })
    }

    async fn records(&self, query: BorrowRecordQuery) -> AppResult<Vec<BorrowRecord>> {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT r.id, r.user_id, r.book_id, r.action, r.quantity, r.created_at,
                   u.name AS user_name, b.title AS book_title
            FROM borrow_records r
            JOIN users u ON u.id = r.user_id
            JOIN books b ON b.id = r.book_id
            WHERE 1=1
            "#,
        );

        if let Some(user_id) = query.user_id {
            builder.push(" AND r.user_id = ").push_bind(user_id);
        }
        if let Some(book_id) = query.book_id {
            builder.push(" AND r.book_id = ").push_bind(book_id);
        }
        if let Some(action) = query.action {
            builder.push(" AND r.action = ").push_bind(action.as_str());
        }

        builder.push(" ORDER BY r.created_at DESC, r.id DESC");

        let records = builder
            .build_query_as::<BorrowRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }
}
