use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::comment::CommentDetails;
use crate::models::group::Group;
use crate::models::post::PostDetails;
use crate::models::user::UserPublic;

/// Gambar yang dikirim FE sebagai base64 (boleh berupa data URL)
#[derive(Debug, Clone, Deserialize)]
pub struct ImageUpload {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub content_type: String, // "image/jpeg", "image/png", etc. Kosong -> tebak dari file_name
    pub image_data: String,
}

/// Body for both create and edit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub group: Option<Uuid>,
    #[serde(default)]
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupRef {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

impl From<&Group> for GroupRef {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id,
            title: group.title.clone(),
            slug: group.slug.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostOut {
    pub id: Uuid,
    pub text: String,
    pub summary: String,
    pub pub_date: DateTime<Utc>,
    pub author: Option<UserPublic>,
    pub group: Option<GroupRef>,
    pub image: Option<String>,
}

impl From<&PostDetails> for PostOut {
    fn from(details: &PostDetails) -> Self {
        let post = &details.post;
        Self {
            id: post.id,
            text: post.text.clone(),
            summary: post.summary(),
            pub_date: post.pub_date,
            author: details.author.as_ref().map(UserPublic::from),
            group: details.group.as_ref().map(GroupRef::from),
            image: post.image.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentOut {
    pub id: Uuid,
    pub author: Option<UserPublic>,
    pub text: String,
    pub created: DateTime<Utc>,
}

impl From<&CommentDetails> for CommentOut {
    fn from(details: &CommentDetails) -> Self {
        Self {
            id: details.comment.id,
            author: details.author.as_ref().map(UserPublic::from),
            text: details.comment.text.clone(),
            created: details.comment.created,
        }
    }
}
