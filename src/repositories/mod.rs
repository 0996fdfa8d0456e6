pub mod memory_store;
pub mod pg_store;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::comment::{Comment, CommentDetails, NewComment};
use crate::models::group::{Group, NewGroup};
use crate::models::post::{NewPost, Post, PostChanges, PostDetails};
use crate::models::user::User;

pub use memory_store::MemoryStore;
pub use pg_store::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("referenced {0} does not exist")]
    MissingReference(&'static str),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Group(Uuid),
    Author(Uuid),
    /// Posts by every author the given user follows.
    FollowedBy(Uuid),
}

/// Persistence for users, groups, posts, comments and follow edges.
///
/// Each call is atomic and visible to the next read. Listings are ordered
/// newest first.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn create_user(&self, username: &str) -> Result<User, StoreError>;
    /// Inserts the user with a known id, or renames it when the id exists.
    /// `Conflict` when another user already holds `username`.
    async fn ensure_user(&self, id: Uuid, username: &str) -> Result<User, StoreError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn create_group(&self, group: NewGroup) -> Result<Group, StoreError>;
    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StoreError>;
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>, StoreError>;
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;
    /// Posts in the group keep existing with their group cleared.
    async fn delete_group(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError>;
    async fn get_post(&self, id: Uuid) -> Result<Option<PostDetails>, StoreError>;
    async fn update_post(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>, StoreError>;
    /// Removes the post and its comments.
    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn count_posts(&self, scope: PostScope) -> Result<u64, StoreError>;
    async fn list_posts(
        &self,
        scope: PostScope,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostDetails>, StoreError>;

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StoreError>;
    /// Oldest first.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentDetails>, StoreError>;

    /// Inserts the edge unless it exists. Returns true when a row was created.
    async fn create_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, StoreError>;
    /// Returns true when a row was removed.
    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, StoreError>;
    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, StoreError>;
}
