// src/services/follow_services.rs - follow / unfollow edges
use std::sync::Arc;

use log::{debug, info};
use uuid::Uuid;

use crate::models::user::User;
use crate::repositories::EntityStore;
use crate::services::ServiceError;

#[derive(Clone)]
pub struct FollowService {
    store: Arc<dyn EntityStore>,
}

impl FollowService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    async fn author(&self, username: &str) -> Result<User, ServiceError> {
        self.store
            .find_user_by_username(username)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }

    /// Idempotent. Following yourself is silently ignored.
    /// Returns true when a new edge was created.
    pub async fn follow_author(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, ServiceError> {
        if user_id == author_id {
            debug!("user {} tried to follow themselves, ignored", user_id);
            return Ok(false);
        }
        let created = self.store.create_follow(user_id, author_id).await?;
        if created {
            info!("user {} now follows {}", user_id, author_id);
        }
        Ok(created)
    }

    /// Removing an edge that does not exist is not an error.
    pub async fn unfollow_author(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, ServiceError> {
        let removed = self.store.delete_follow(user_id, author_id).await?;
        if removed {
            info!("user {} unfollowed {}", user_id, author_id);
        }
        Ok(removed)
    }

    pub async fn follow(&self, user_id: Uuid, author_username: &str) -> Result<bool, ServiceError> {
        let author = self.author(author_username).await?;
        self.follow_author(user_id, author.id).await
    }

    pub async fn unfollow(&self, user_id: Uuid, author_username: &str) -> Result<bool, ServiceError> {
        let author = self.author(author_username).await?;
        self.unfollow_author(user_id, author.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;

    async fn setup() -> (Arc<MemoryStore>, FollowService, User, User) {
        let store = Arc::new(MemoryStore::new());
        let reader = store.create_user("mia").await.unwrap();
        let author = store.create_user("leo").await.unwrap();
        let service = FollowService::new(store.clone());
        (store, service, reader, author)
    }

    #[tokio::test]
    async fn following_twice_keeps_one_edge() {
        let (store, service, reader, author) = setup().await;

        assert!(service.follow(reader.id, "leo").await.unwrap());
        assert!(!service.follow(reader.id, "leo").await.unwrap());

        assert!(store.is_following(reader.id, author.id).await.unwrap());
        assert!(store.delete_follow(reader.id, author.id).await.unwrap());
        assert!(!store.is_following(reader.id, author.id).await.unwrap());
    }

    #[tokio::test]
    async fn self_follow_creates_nothing() {
        let (store, service, reader, _) = setup().await;

        assert!(!service.follow(reader.id, "mia").await.unwrap());
        assert!(!store.is_following(reader.id, reader.id).await.unwrap());
    }

    #[tokio::test]
    async fn unfollow_without_edge_is_a_no_op() {
        let (_, service, reader, _) = setup().await;

        assert!(!service.unfollow(reader.id, "leo").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_author_is_not_found() {
        let (_, service, reader, _) = setup().await;

        assert!(matches!(
            service.follow(reader.id, "ghost").await,
            Err(ServiceError::NotFound("user"))
        ));
    }
}
