// src/repositories/pg_store.rs - EntityStore over deadpool-postgres
use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use uuid::Uuid;

use crate::models::comment::{Comment, CommentDetails, NewComment};
use crate::models::group::{Group, NewGroup};
use crate::models::post::{NewPost, Post, PostChanges, PostDetails};
use crate::models::user::User;
use crate::repositories::{EntityStore, PostScope, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    username TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS blog_groups (
    id UUID PRIMARY KEY,
    title VARCHAR(200) NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS posts (
    id UUID PRIMARY KEY,
    text TEXT NOT NULL CHECK (text <> ''),
    pub_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    seq BIGSERIAL,
    author_id UUID REFERENCES users(id) ON DELETE CASCADE,
    group_id UUID REFERENCES blog_groups(id) ON DELETE SET NULL,
    image TEXT
);
CREATE INDEX IF NOT EXISTS posts_pub_date_idx ON posts (pub_date DESC, seq DESC);
CREATE TABLE IF NOT EXISTS comments (
    id UUID PRIMARY KEY,
    post_id UUID NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    text TEXT NOT NULL CHECK (text <> ''),
    created TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    seq BIGSERIAL
);
CREATE TABLE IF NOT EXISTS follows (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    UNIQUE (user_id, author_id),
    CHECK (user_id <> author_id)
);
"#;

const POST_SELECT: &str = r#"
SELECT p.id, p.text, p.pub_date, p.author_id, p.group_id, p.image,
       u.username AS author_username,
       g.title AS group_title, g.slug AS group_slug, g.description AS group_description
FROM posts p
LEFT JOIN users u ON u.id = p.author_id
LEFT JOIN blog_groups g ON g.id = p.group_id
"#;

const POST_RETURNING: &str = "RETURNING id, text, pub_date, author_id, group_id, image";

#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates missing tables. Safe to run on every start.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA).await?;
        Ok(())
    }
}

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
    }
}

fn group_from_row(row: &Row) -> Group {
    Group {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
    }
}

fn post_from_row(row: &Row) -> Post {
    Post {
        id: row.get("id"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        author_id: row.get("author_id"),
        group_id: row.get("group_id"),
        image: row.get("image"),
    }
}

fn details_from_row(row: &Row) -> PostDetails {
    let post = post_from_row(row);
    let author = match (post.author_id, row.get::<_, Option<String>>("author_username")) {
        (Some(id), Some(username)) => Some(User { id, username }),
        _ => None,
    };
    let group = match (post.group_id, row.get::<_, Option<String>>("group_slug")) {
        (Some(id), Some(slug)) => Some(Group {
            id,
            slug,
            title: row.get("group_title"),
            description: row.get("group_description"),
        }),
        _ => None,
    };
    PostDetails { post, author, group }
}

/// WHERE clause for a scope; the scope's id, when present, is `$1`.
fn scope_filter(scope: PostScope) -> (&'static str, Option<Uuid>) {
    match scope {
        PostScope::All => ("", None),
        PostScope::Group(id) => ("WHERE p.group_id = $1", Some(id)),
        PostScope::Author(id) => ("WHERE p.author_id = $1", Some(id)),
        PostScope::FollowedBy(id) => (
            "WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = $1)",
            Some(id),
        ),
    }
}

fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

fn foreign_key_or(err: tokio_postgres::Error, what: &'static str) -> StoreError {
    if err.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) {
        StoreError::MissingReference(what)
    } else {
        StoreError::Postgres(err)
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn create_user(&self, username: &str) -> Result<User, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO users (id, username) VALUES ($1, $2) RETURNING id, username",
                &[&Uuid::new_v4(), &username],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("username {username} taken"))
                } else {
                    StoreError::Postgres(e)
                }
            })?;
        Ok(user_from_row(&row))
    }

    async fn ensure_user(&self, id: Uuid, username: &str) -> Result<User, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO users (id, username) VALUES ($1, $2) \
                 ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username \
                 RETURNING id, username",
                &[&id, &username],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("username {username} taken"))
                } else {
                    StoreError::Postgres(e)
                }
            })?;
        Ok(user_from_row(&row))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT id, username FROM users WHERE id = $1", &[&id])
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT id, username FROM users WHERE username = $1", &[&username])
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO blog_groups (id, title, slug, description) VALUES ($1, $2, $3, $4) \
                 RETURNING id, title, slug, description",
                &[&Uuid::new_v4(), &group.title, &group.slug, &group.description],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("slug {} taken", group.slug))
                } else {
                    StoreError::Postgres(e)
                }
            })?;
        Ok(group_from_row(&row))
    }

    async fn find_group(&self, id: Uuid) -> Result<Option<Group>, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, title, slug, description FROM blog_groups WHERE id = $1",
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(group_from_row))
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, title, slug, description FROM blog_groups WHERE slug = $1",
                &[&slug],
            )
            .await?;
        Ok(row.as_ref().map(group_from_row))
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, title, slug, description FROM blog_groups ORDER BY title",
                &[],
            )
            .await?;
        Ok(rows.iter().map(group_from_row).collect())
    }

    async fn delete_group(&self, id: Uuid) -> Result<bool, StoreError> {
        let client = self.pool.get().await?;
        // posts.group_id is ON DELETE SET NULL
        let n = client
            .execute("DELETE FROM blog_groups WHERE id = $1", &[&id])
            .await?;
        Ok(n > 0)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO posts (id, text, author_id, group_id, image) VALUES ($1, $2, $3, $4, $5) {POST_RETURNING}"
        );
        let row = client
            .query_one(
                sql.as_str(),
                &[&Uuid::new_v4(), &post.text, &post.author_id, &post.group_id, &post.image],
            )
            .await
            .map_err(|e| foreign_key_or(e, "author or group"))?;
        Ok(post_from_row(&row))
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<PostDetails>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!("{POST_SELECT} WHERE p.id = $1");
        let row = client.query_opt(sql.as_str(), &[&id]).await?;
        Ok(row.as_ref().map(details_from_row))
    }

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "UPDATE posts SET text = $2, group_id = $3, image = $4 WHERE id = $1 {POST_RETURNING}"
        );
        let row = client
            .query_opt(
                sql.as_str(),
                &[&id, &changes.text, &changes.group_id, &changes.image],
            )
            .await
            .map_err(|e| foreign_key_or(e, "group"))?;
        Ok(row.as_ref().map(post_from_row))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError> {
        let client = self.pool.get().await?;
        let n = client.execute("DELETE FROM posts WHERE id = $1", &[&id]).await?;
        Ok(n > 0)
    }

    async fn count_posts(&self, scope: PostScope) -> Result<u64, StoreError> {
        let client = self.pool.get().await?;
        let (filter, arg) = scope_filter(scope);
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        if let Some(ref id) = arg {
            params.push(id);
        }
        let sql = format!("SELECT COUNT(*) FROM posts p {filter}");
        let row = client.query_one(sql.as_str(), &params).await?;
        let n: i64 = row.get(0);
        Ok(n as u64)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostDetails>, StoreError> {
        let client = self.pool.get().await?;
        let (filter, arg) = scope_filter(scope);
        let limit = limit as i64;
        let offset = offset as i64;
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        if let Some(ref id) = arg {
            params.push(id);
        }
        params.push(&limit);
        params.push(&offset);
        let n = params.len();
        let sql = format!(
            "{POST_SELECT} {filter} ORDER BY p.pub_date DESC, p.seq DESC LIMIT ${} OFFSET ${}",
            n - 1,
            n
        );
        let rows = client.query(sql.as_str(), &params).await?;
        Ok(rows.iter().map(details_from_row).collect())
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO comments (id, post_id, author_id, text) VALUES ($1, $2, $3, $4) \
                 RETURNING id, post_id, author_id, text, created",
                &[&Uuid::new_v4(), &comment.post_id, &comment.author_id, &comment.text],
            )
            .await
            .map_err(|e| foreign_key_or(e, "post or author"))?;
        Ok(Comment {
            id: row.get("id"),
            post_id: row.get("post_id"),
            author_id: row.get("author_id"),
            text: row.get("text"),
            created: row.get("created"),
        })
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentDetails>, StoreError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT c.id, c.post_id, c.author_id, c.text, c.created, u.username \
                 FROM comments c LEFT JOIN users u ON u.id = c.author_id \
                 WHERE c.post_id = $1 ORDER BY c.created, c.seq",
                &[&post_id],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| {
                let comment = Comment {
                    id: row.get("id"),
                    post_id: row.get("post_id"),
                    author_id: row.get("author_id"),
                    text: row.get("text"),
                    created: row.get("created"),
                };
                let author = row
                    .get::<_, Option<String>>("username")
                    .map(|username| User {
                        id: comment.author_id,
                        username,
                    });
                CommentDetails { comment, author }
            })
            .collect())
    }

    async fn create_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, StoreError> {
        let client = self.pool.get().await?;
        // single statement: the unique constraint closes the check-then-insert race
        let n = client
            .execute(
                "INSERT INTO follows (id, user_id, author_id) \
                 SELECT $1::uuid, $2::uuid, $3::uuid WHERE $2::uuid <> $3::uuid \
                 ON CONFLICT (user_id, author_id) DO NOTHING",
                &[&Uuid::new_v4(), &user_id, &author_id],
            )
            .await?;
        Ok(n > 0)
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, StoreError> {
        let client = self.pool.get().await?;
        let n = client
            .execute(
                "DELETE FROM follows WHERE user_id = $1 AND author_id = $2",
                &[&user_id, &author_id],
            )
            .await?;
        Ok(n > 0)
    }

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
                &[&user_id, &author_id],
            )
            .await?;
        Ok(row.get(0))
    }
}
