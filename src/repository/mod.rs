//! Repository layer for database operations

pub mod books;
pub mod categories;
pub mod ledger;
pub mod users;

use std::time::Duration;

use sqlx::{Pool, Postgres, Transaction};

use crate::error::AppResult;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub categories: categories::CategoriesRepository,
    pub users: users::UsersRepository,
    pub ledger: ledger::LedgerRepository,
}

impl Repository {
    /// Create a new repository with the given database pool.
    ///
    /// `transaction_timeout` bounds lock waits and statements inside every
    /// multi-step write.
    pub fn new(pool: Pool<Postgres>, transaction_timeout: Duration) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone(), transaction_timeout),
            categories: categories::CategoriesRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            ledger: ledger::LedgerRepository::new(pool.clone(), transaction_timeout),
            pool,
        }
    }

    /// Round-trip to the database, used by the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Open a transaction whose lock waits and statements are bounded by `timeout`.
///
/// Dropping the returned transaction without committing rolls it back.
pub(crate) async fn begin_bounded(
    pool: &Pool<Postgres>,
    timeout: Duration,
) -> AppResult<Transaction<'static, Postgres>> {
    let mut tx = pool.begin().await?;
    let millis = timeout.as_millis();

    // SET does not take bind parameters
    sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", millis))
        .execute(&mut *tx)
        .await?;
    sqlx::query(&format!("SET LOCAL statement_timeout = '{}ms'", millis))
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
