//! Business logic services

pub mod catalog;
pub mod ledger;
pub mod users;

use std::{sync::Arc, time::Duration};

use crate::repository::Repository;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub ledger: ledger::LedgerService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, transaction_timeout: Duration) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            users: users::UsersService::new(repository.clone()),
            ledger: ledger::LedgerService::new(
                Arc::new(repository.ledger.clone()),
                transaction_timeout,
            ),
            repository,
        }
    }

    /// Check that the database answers
    pub async fn ping_database(&self) -> crate::error::AppResult<()> {
        self.repository.ping().await
    }
}
