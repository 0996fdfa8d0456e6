pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;

use std::sync::Arc;

use crate::repositories::EntityStore;
use crate::services::feed_services::FeedService;
use crate::services::follow_services::FollowService;
use crate::services::group_services::GroupService;
use crate::services::media_services::MediaStorage;
use crate::services::page_cache::PageCache;
use crate::services::post_services::PostService;
use crate::services::user_services::UserService;

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub feed: FeedService,
    pub posts: PostService,
    pub follows: FollowService,
    pub groups: GroupService,
    pub users: UserService,
    pub cache: Arc<PageCache>,
    pub media: MediaStorage,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>, cache: Arc<PageCache>, media: MediaStorage) -> Self {
        Self {
            feed: FeedService::new(store.clone(), cache.clone()),
            posts: PostService::new(store.clone(), media.clone()),
            follows: FollowService::new(store.clone()),
            groups: GroupService::new(store.clone()),
            users: UserService::new(store),
            cache,
            media,
        }
    }
}
