//! Borrow/return service

use std::{future::Future, sync::Arc, time::Duration};

use crate::{
    error::{AppError, AppResult},
    models::borrow::{BorrowReceipt, BorrowRecord, BorrowRecordQuery, LedgerRequest},
    repository::ledger::LedgerStore,
};

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    timeout: Duration,
}

impl LedgerService {
    /// `timeout` caps a whole borrow or return, lock waits included
    pub fn new(store: Arc<dyn LedgerStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Lend copies of a book to a user
    pub async fn borrow(&self, request: LedgerRequest) -> AppResult<BorrowReceipt> {
        self.bounded(self.store.borrow(request)).await
    }

    /// Take back copies of a book from a user
    pub async fn return_books(&self, request: LedgerRequest) -> AppResult<BorrowReceipt> {
        self.bounded(self.store.return_books(request)).await
    }

    /// Audit history, newest first
    pub async fn records(&self, query: BorrowRecordQuery) -> AppResult<Vec<BorrowRecord>> {
        self.store.records(query).await
    }

    /// Run a ledger operation under the configured timeout. Expiry drops the
    /// operation's future, which rolls back its open transaction.
    async fn bounded<T>(&self, operation: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        let millis = self.timeout.as_millis() as u64;
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => result.map_err(|e| e.classify_timeout(millis)),
            Err(_) => Err(AppError::Timeout(millis)),
        }
    }
}
