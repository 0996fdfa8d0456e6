use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::group::Group;
use crate::models::user::User;

/// Number of characters shown when a post is summarised.
pub const SUMMARY_CHARS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    /// Reference returned by the media storage, e.g. `posts/<file>`.
    pub image: Option<String>,
}

impl Post {
    pub fn summary(&self) -> String {
        self.text.chars().take(SUMMARY_CHARS).collect()
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

/// Mutable fields of a post. `pub_date` and `author_id` are never touched.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

/// A post joined with its author and group, as listings need it.
#[derive(Debug, Clone)]
pub struct PostDetails {
    pub post: Post,
    pub author: Option<User>,
    pub group: Option<Group>,
}
