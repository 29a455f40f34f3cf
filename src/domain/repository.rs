use crate::domain::expense::Expense;
use crate::domain::user::User;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn insert(&self, expense: Expense) -> Result<()>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Expense>>;
    /// Latest first: `created_at` descending, ties by insertion order descending.
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Expense>>;
    /// Returns `false` when no expense with that id exists.
    async fn update(&self, expense: Expense) -> Result<bool>;
    /// Returns `false` when no expense with that id exists.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `ValidationError::DuplicateUsername` if the username is taken.
    async fn save_user(&self, user: User) -> Result<()>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
}
