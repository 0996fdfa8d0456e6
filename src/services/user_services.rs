// src/services/user_services.rs - local user rows for token holders
use std::sync::Arc;

use log::{info, warn};
use uuid::Uuid;

use crate::models::user::User;
use crate::repositories::{EntityStore, StoreError};
use crate::services::ServiceError;

/// Accounts live in the auth subsystem; a token holder gets a local row
/// the first time they write, so posts and follows have an author to point to.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn EntityStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Makes sure `(id, username)` exists locally. A renamed account takes
    /// its new username.
    pub async fn sync_user(&self, id: Uuid, username: &str) -> Result<User, ServiceError> {
        if let Some(user) = self.store.find_user(id).await? {
            if user.username == username {
                return Ok(user);
            }
        }
        match self.store.ensure_user(id, username).await {
            Ok(user) => {
                info!("user {} registered as {}", id, username);
                Ok(user)
            }
            Err(StoreError::Conflict(message)) => {
                warn!("user {} cannot take username {}: {}", id, username, message);
                Err(ServiceError::Conflict(message))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;

    #[tokio::test]
    async fn first_sync_creates_the_user() {
        let store = Arc::new(MemoryStore::new());
        let users = UserService::new(store.clone());
        let id = Uuid::new_v4();

        let user = users.sync_user(id, "alice").await.unwrap();
        assert_eq!(user.id, id);
        let again = users.sync_user(id, "alice").await.unwrap();
        assert_eq!(again.username, "alice");
        assert_eq!(store.find_user_by_username("alice").await.unwrap().unwrap().id, id);
    }

    #[tokio::test]
    async fn taken_username_is_a_conflict() {
        let store = Arc::new(MemoryStore::new());
        store.create_user("alice").await.unwrap();
        let users = UserService::new(store);

        let result = users.sync_user(Uuid::new_v4(), "alice").await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }
}
