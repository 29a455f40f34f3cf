use crate::domain::error::{DomainError, ValidationError};
use crate::domain::repository::UserRepository;
use crate::domain::user::User;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct InMemoryUserRepository {
    storage: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user), fields(user_id = %user.id, username = %user.username))]
    async fn save_user(&self, user: User) -> Result<()> {
        trace!("Acquiring write lock for user storage");
        let mut storage = self.storage.write().await;
        // Checked under the write lock so concurrent signups cannot share a name.
        if storage
            .values()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            warn!(username = %user.username, "Username already taken");
            return Err(DomainError::from(ValidationError::DuplicateUsername).into());
        }
        storage.insert(user.id, user.clone());
        debug!(
            user_id = %user.id,
            username = %user.username,
            "User saved to memory storage"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        trace!("Acquiring read lock for user storage");
        let storage = self.storage.read().await;
        let user = storage.values().find(|u| u.username == username).cloned();
        match &user {
            Some(u) => debug!(user_id = %u.id, "User found in storage"),
            None => trace!("User not found in storage"),
        }
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let storage = self.storage.read().await;
        let user = storage.get(&id).cloned();
        if user.is_none() {
            trace!(user_id = %id, "User not found in storage");
        }
        Ok(user)
    }
}
