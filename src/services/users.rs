//! User registry service

use validator::Validate;

use crate::{
    error::AppResult,
    models::{borrow::CurrentBorrow, user::{User, UserInput}},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn create_user(&self, user: UserInput) -> AppResult<User> {
        let user = user.normalized();
        user.validate()?;
        self.repository.users.create(&user).await
    }

    pub async fn update_user(&self, id: i32, user: UserInput) -> AppResult<User> {
        let user = user.normalized();
        user.validate()?;
        self.repository.users.update(id, &user).await
    }

    /// Outstanding loans of a user
    pub async fn current_borrows(&self, user_id: i32) -> AppResult<Vec<CurrentBorrow>> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;
        self.repository.ledger.current_borrows_for_user(user_id).await
    }
}
