use serde::Serialize;

use crate::dtos::post_dtos::{CommentOut, PostOut};
use crate::models::group::Group;
use crate::models::user::UserPublic;

/// One page of a listing plus the navigation flags the views need.
#[derive(Debug, Clone, Serialize)]
pub struct PageOut<T: Serialize> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupPageOut {
    pub group: Group,
    pub page_obj: PageOut<PostOut>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileOut {
    pub author: UserPublic,
    pub post_count: u64,
    pub following: bool,
    pub page_obj: PageOut<PostOut>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetailOut {
    pub post: PostOut,
    /// Total posts by the same author.
    pub author_post_count: u64,
    pub comments: Vec<CommentOut>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexOut {
    pub title: String,
    pub page_obj: PageOut<PostOut>,
}
