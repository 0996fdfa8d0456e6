// src/repositories/memory_store.rs - in-process store for tests and local runs
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::comment::{Comment, CommentDetails, NewComment};
use crate::models::follow::Follow;
use crate::models::group::{Group, NewGroup};
use crate::models::post::{NewPost, Post, PostChanges, PostDetails};
use crate::models::user::User;
use crate::repositories::{EntityStore, PostScope, StoreError};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    /// (insertion sequence, row) so equal timestamps still sort newest first
    posts: Vec<(u64, Post)>,
    comments: Vec<(u64, Comment)>,
    follows: Vec<Follow>,
    seq: u64,
}

impl Tables {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn user(&self, id: Option<Uuid>) -> Option<User> {
        let id = id?;
        self.users.iter().find(|u| u.id == id).cloned()
    }

    fn group(&self, id: Option<Uuid>) -> Option<Group> {
        let id = id?;
        self.groups.iter().find(|g| g.id == id).cloned()
    }

    fn details(&self, post: &Post) -> PostDetails {
        PostDetails {
            post: post.clone(),
            author: self.user(post.author_id),
            group: self.group(post.group_id),
        }
    }

    fn in_scope(&self, post: &Post, scope: PostScope) -> bool {
        match scope {
            PostScope::All => true,
            PostScope::Group(group_id) => post.group_id == Some(group_id),
            PostScope::Author(author_id) => post.author_id == Some(author_id),
            PostScope::FollowedBy(user_id) => post.author_id.is_some_and(|author_id| {
                self.follows
                    .iter()
                    .any(|f| f.user_id == user_id && f.author_id == author_id)
            }),
        }
    }
}

/// Mutex-guarded tables implementing [`EntityStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_user(&self, username: &str) -> Result<User, StoreError> {
        let mut t = self.lock()?;
        if t.users.iter().any(|u| u.username == username) {
            return Err(StoreError::Conflict(format!("username {username} taken")));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn ensure_user(&self, id: Uuid, username: &str) -> Result<User, StoreError> {
        let mut t = self.lock()?;
        if t.users.iter().any(|u| u.username == username && u.id != id) {
            return Err(StoreError::Conflict(format!("username {username} taken")));
        }
        let user = User {
            id,
            username: username.to_string(),
        };
        match t.users.iter().position(|u| u.id == id) {
            Some(i) => t.users[i] = user.clone(),
            None => t.users.push(user.clone()),
        }
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.user(Some(id)))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let t = self.lock()?;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group, StoreError> {
        let mut t = self.lock()?;
        if t.groups.iter().any(|g| g.slug == group.slug) {
            return Err(StoreError::Conflict(format!("slug {} taken", group.slug)));
        }
        let group = Group {
            id: Uuid::new_v4(),
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        t.groups.push(group.clone());
        Ok(group)
    }

    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StoreError> {
        Ok(self.lock()?.group(Some(id)))
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>, StoreError> {
        let t = self.lock()?;
        Ok(t.groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let mut groups = self.lock()?.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn delete_group(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.lock()?;
        let before = t.groups.len();
        t.groups.retain(|g| g.id != id);
        if t.groups.len() == before {
            return Ok(false);
        }
        for (_, post) in t.posts.iter_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        Ok(true)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let mut t = self.lock()?;
        if t.user(Some(post.author_id)).is_none() {
            return Err(StoreError::MissingReference("author"));
        }
        if post.group_id.is_some() && t.group(post.group_id).is_none() {
            return Err(StoreError::MissingReference("group"));
        }
        let post = Post {
            id: Uuid::new_v4(),
            text: post.text,
            pub_date: Utc::now(),
            author_id: Some(post.author_id),
            group_id: post.group_id,
            image: post.image,
        };
        let seq = t.next_seq();
        t.posts.push((seq, post.clone()));
        Ok(post)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<PostDetails>, StoreError> {
        let t = self.lock()?;
        Ok(t
            .posts
            .iter()
            .find(|(_, p)| p.id == id)
            .map(|(_, p)| t.details(p)))
    }

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>, StoreError> {
        let mut t = self.lock()?;
        let Some((_, post)) = t.posts.iter_mut().find(|(_, p)| p.id == id) else {
            return Ok(None);
        };
        post.text = changes.text;
        post.group_id = changes.group_id;
        post.image = changes.image;
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.lock()?;
        let before = t.posts.len();
        t.posts.retain(|(_, p)| p.id != id);
        if t.posts.len() == before {
            return Ok(false);
        }
        t.comments.retain(|(_, c)| c.post_id != id);
        Ok(true)
    }

    async fn count_posts(&self, scope: PostScope) -> Result<u64, StoreError> {
        let t = self.lock()?;
        let n = t.posts.iter().filter(|(_, p)| t.in_scope(p, scope)).count();
        Ok(n as u64)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostDetails>, StoreError> {
        let t = self.lock()?;
        let mut rows: Vec<&(u64, Post)> = t
            .posts
            .iter()
            .filter(|(_, p)| t.in_scope(p, scope))
            .collect();
        rows.sort_by(|(sa, a), (sb, b)| b.pub_date.cmp(&a.pub_date).then(sb.cmp(sa)));
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|(_, p)| t.details(p))
            .collect())
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let mut t = self.lock()?;
        if !t.posts.iter().any(|(_, p)| p.id == comment.post_id) {
            return Err(StoreError::MissingReference("post"));
        }
        if t.user(Some(comment.author_id)).is_none() {
            return Err(StoreError::MissingReference("author"));
        }
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created: Utc::now(),
        };
        let seq = t.next_seq();
        t.comments.push((seq, comment.clone()));
        Ok(comment)
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentDetails>, StoreError> {
        let t = self.lock()?;
        let mut rows: Vec<&(u64, Comment)> =
            t.comments.iter().filter(|(_, c)| c.post_id == post_id).collect();
        rows.sort_by(|(sa, a), (sb, b)| a.created.cmp(&b.created).then(sa.cmp(sb)));
        Ok(rows
            .into_iter()
            .map(|(_, c)| CommentDetails {
                comment: c.clone(),
                author: t.user(Some(c.author_id)),
            })
            .collect())
    }

    async fn create_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, StoreError> {
        // check and insert happen under one lock
        let mut t = self.lock()?;
        if user_id == author_id
            || t.follows
                .iter()
                .any(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Ok(false);
        }
        t.follows.push(Follow {
            id: Uuid::new_v4(),
            user_id,
            author_id,
        });
        Ok(true)
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.lock()?;
        let before = t.follows.len();
        t.follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(t.follows.len() != before)
    }

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, StoreError> {
        let t = self.lock()?;
        Ok(t.follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed() -> (MemoryStore, User, Group) {
        let store = MemoryStore::new();
        let author = store.create_user("leo").await.unwrap();
        let group = store
            .create_group(NewGroup {
                title: "Lizards".into(),
                slug: "lizards".into(),
                description: "Cold blooded".into(),
            })
            .await
            .unwrap();
        (store, author, group)
    }

    fn new_post(author: &User, group: Option<&Group>, text: &str) -> NewPost {
        NewPost {
            author_id: author.id,
            text: text.into(),
            group_id: group.map(|g| g.id),
            image: None,
        }
    }

    #[tokio::test]
    async fn deleting_group_clears_post_reference() {
        let (store, author, group) = seed().await;
        let post = store.create_post(new_post(&author, Some(&group), "hi")).await.unwrap();

        assert!(store.delete_group(group.id).await.unwrap());

        let details = store.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(details.post.group_id, None);
        assert!(details.group.is_none());
        assert_eq!(store.count_posts(PostScope::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn deleting_post_removes_its_comments() {
        let (store, author, _) = seed().await;
        let post = store.create_post(new_post(&author, None, "hi")).await.unwrap();
        store
            .create_comment(NewComment {
                post_id: post.id,
                author_id: author.id,
                text: "first".into(),
            })
            .await
            .unwrap();

        assert!(store.delete_post(post.id).await.unwrap());
        assert!(store.list_comments(post.id).await.unwrap().is_empty());
        assert!(!store.delete_post(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn ensure_user_inserts_then_renames() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();

        let user = store.ensure_user(id, "alice").await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(store.find_user_by_username("alice").await.unwrap().unwrap().id, id);

        store.ensure_user(id, "alice2").await.unwrap();
        assert!(store.find_user_by_username("alice").await.unwrap().is_none());
        assert_eq!(store.find_user(id).await.unwrap().unwrap().username, "alice2");

        let err = store.ensure_user(Uuid::new_v4(), "alice2").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn post_needs_existing_author() {
        let store = MemoryStore::new();
        let stranger = User {
            id: Uuid::new_v4(),
            username: "ghost".into(),
        };
        let err = store.create_post(new_post(&stranger, None, "boo")).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference("author")));
        assert_eq!(store.count_posts(PostScope::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let (store, _, _) = seed().await;
        let err = store
            .create_group(NewGroup {
                title: "Other".into(),
                slug: "lizards".into(),
                description: "x".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn listing_is_newest_first_within_scope() {
        let (store, author, group) = seed().await;
        let other = store.create_user("mia").await.unwrap();
        store.create_post(new_post(&author, Some(&group), "one")).await.unwrap();
        store.create_post(new_post(&other, None, "two")).await.unwrap();
        store.create_post(new_post(&author, None, "three")).await.unwrap();

        let all = store.list_posts(PostScope::All, 0, 10).await.unwrap();
        let texts: Vec<&str> = all.iter().map(|d| d.post.text.as_str()).collect();
        assert_eq!(texts, ["three", "two", "one"]);

        let by_author = store.list_posts(PostScope::Author(author.id), 0, 10).await.unwrap();
        assert_eq!(by_author.len(), 2);
        assert_eq!(by_author[0].author.as_ref().unwrap().username, "leo");

        let in_group = store.list_posts(PostScope::Group(group.id), 0, 10).await.unwrap();
        assert_eq!(in_group.len(), 1);
        assert_eq!(in_group[0].group.as_ref().unwrap().slug, "lizards");
    }

    #[tokio::test]
    async fn follow_edges_are_unique_and_never_self() {
        let (store, author, _) = seed().await;
        let reader = store.create_user("mia").await.unwrap();

        assert!(store.create_follow(reader.id, author.id).await.unwrap());
        assert!(!store.create_follow(reader.id, author.id).await.unwrap());
        assert!(!store.create_follow(author.id, author.id).await.unwrap());
        assert!(store.is_following(reader.id, author.id).await.unwrap());

        assert!(store.delete_follow(reader.id, author.id).await.unwrap());
        assert!(!store.delete_follow(reader.id, author.id).await.unwrap());
    }
}
