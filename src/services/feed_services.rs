// src/services/feed_services.rs - paginated post listings
use std::num::IntErrorKind;
use std::sync::Arc;

use actix_web::web::Bytes;
use log::debug;
use serde::Serialize;
use uuid::Uuid;

use crate::dtos::ApiResponse;
use crate::dtos::feed_dtos::{GroupPageOut, IndexOut, PageOut, PostDetailOut, ProfileOut};
use crate::dtos::post_dtos::{CommentOut, PostOut};
use crate::models::user::UserPublic;
use crate::repositories::{EntityStore, PostScope};
use crate::services::ServiceError;
use crate::services::page_cache::PageCache;

pub const POSTS_PER_PAGE: u64 = 10;
pub const INDEX_TITLE: &str = "Latest updates on the site";

/// Page arithmetic over a listing of `count` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(count: u64, per_page: u64) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    /// An empty listing still has one (empty) page.
    pub fn num_pages(&self) -> u64 {
        if self.count == 0 {
            1
        } else {
            self.count.div_ceil(self.per_page)
        }
    }

    /// Turns a raw `?page=` value into a valid page number. Missing or
    /// non-numeric input gives page 1, numbers outside the range give the
    /// last page.
    pub fn resolve(&self, raw: Option<&str>) -> u64 {
        let last = self.num_pages();
        let Some(raw) = raw.map(str::trim) else {
            return 1;
        };
        if raw == "last" {
            return last;
        }
        match raw.parse::<i64>() {
            Ok(n) if n < 1 => last,
            Ok(n) => (n as u64).min(last),
            // too many digits is still a number, just out of range
            Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => last,
            Err(_) => 1,
        }
    }

    pub fn offset(&self, number: u64) -> u64 {
        (number.max(1) - 1) * self.per_page
    }

    pub fn page<T: Serialize>(&self, number: u64, items: Vec<T>) -> PageOut<T> {
        let last = self.num_pages();
        let has_next = number < last;
        let has_previous = number > 1;
        PageOut {
            items,
            number,
            num_pages: last,
            count: self.count,
            has_next,
            has_previous,
            next_page_number: has_next.then(|| number + 1),
            previous_page_number: has_previous.then(|| number - 1),
        }
    }
}

#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn EntityStore>,
    cache: Arc<PageCache>,
}

impl FeedService {
    pub fn new(store: Arc<dyn EntityStore>, cache: Arc<PageCache>) -> Self {
        Self { store, cache }
    }

    async fn scoped_page(
        &self,
        scope: PostScope,
        page: Option<&str>,
    ) -> Result<PageOut<PostOut>, ServiceError> {
        let count = self.store.count_posts(scope).await?;
        let paginator = Paginator::new(count, POSTS_PER_PAGE);
        let number = paginator.resolve(page);
        let rows = self
            .store
            .list_posts(scope, paginator.offset(number), POSTS_PER_PAGE)
            .await?;
        debug!("{:?} page {} -> {} posts", scope, number, rows.len());
        Ok(paginator.page(number, rows.iter().map(PostOut::from).collect()))
    }

    pub async fn index_page(&self, page: Option<&str>) -> Result<PageOut<PostOut>, ServiceError> {
        self.scoped_page(PostScope::All, page).await
    }

    /// Index listing as response bytes, served from the page cache while fresh.
    pub async fn rendered_index(&self, page: Option<&str>) -> Result<Bytes, ServiceError> {
        let key = format!("index:{}", page.unwrap_or(""));
        if let Some(hit) = self.cache.get(&key) {
            debug!("page cache hit for {}", key);
            return Ok(hit);
        }

        let body = IndexOut {
            title: INDEX_TITLE.to_string(),
            page_obj: self.index_page(page).await?,
        };
        let rendered = Bytes::from(serde_json::to_vec(&ApiResponse::success(
            "Posts retrieved successfully",
            body,
        ))?);
        self.cache.put(&key, rendered.clone());
        Ok(rendered)
    }

    pub async fn group_page(&self, slug: &str, page: Option<&str>) -> Result<GroupPageOut, ServiceError> {
        let group = self
            .store
            .find_group_by_slug(slug)
            .await?
            .ok_or(ServiceError::NotFound("group"))?;
        let page_obj = self.scoped_page(PostScope::Group(group.id), page).await?;
        Ok(GroupPageOut { group, page_obj })
    }

    /// `viewer` is the authenticated caller, if any; it decides `following`.
    pub async fn profile_page(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        page: Option<&str>,
    ) -> Result<ProfileOut, ServiceError> {
        let author = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;
        let page_obj = self.scoped_page(PostScope::Author(author.id), page).await?;
        let following = match viewer {
            Some(viewer_id) => self.store.is_following(viewer_id, author.id).await?,
            None => false,
        };
        Ok(ProfileOut {
            author: UserPublic::from(&author),
            post_count: page_obj.count,
            following,
            page_obj,
        })
    }

    /// Posts by everyone `user_id` follows. Following nobody gives an empty page.
    pub async fn follow_page(&self, user_id: Uuid, page: Option<&str>) -> Result<PageOut<PostOut>, ServiceError> {
        self.scoped_page(PostScope::FollowedBy(user_id), page).await
    }

    pub async fn post_detail(&self, post_id: Uuid) -> Result<PostDetailOut, ServiceError> {
        let details = self
            .store
            .get_post(post_id)
            .await?
            .ok_or(ServiceError::NotFound("post"))?;
        let author_post_count = match details.post.author_id {
            Some(author_id) => self.store.count_posts(PostScope::Author(author_id)).await?,
            None => 0,
        };
        let comments = self.store.list_comments(post_id).await?;
        Ok(PostDetailOut {
            post: PostOut::from(&details),
            author_post_count,
            comments: comments.iter().map(CommentOut::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::group::NewGroup;
    use crate::models::post::NewPost;
    use crate::models::user::User;
    use crate::repositories::MemoryStore;
    use crate::services::page_cache::{DEFAULT_TTL_SECS, ManualClock};

    fn feed(store: Arc<MemoryStore>) -> FeedService {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = Arc::new(PageCache::new(Duration::seconds(DEFAULT_TTL_SECS), clock));
        FeedService::new(store, cache)
    }

    async fn write_posts(store: &MemoryStore, author: &User, n: usize) {
        for i in 0..n {
            store
                .create_post(NewPost {
                    author_id: author.id,
                    text: format!("post {i}"),
                    group_id: None,
                    image: None,
                })
                .await
                .unwrap();
        }
    }

    #[test]
    fn paginator_resolves_page_numbers() {
        let p = Paginator::new(13, POSTS_PER_PAGE);
        assert_eq!(p.num_pages(), 2);
        assert_eq!(p.resolve(None), 1);
        assert_eq!(p.resolve(Some("abc")), 1);
        assert_eq!(p.resolve(Some("")), 1);
        assert_eq!(p.resolve(Some("2")), 2);
        assert_eq!(p.resolve(Some("99")), 2);
        assert_eq!(p.resolve(Some("0")), 2);
        assert_eq!(p.resolve(Some("last")), 2);
        assert_eq!(p.resolve(Some("99999999999999999999")), 2);
        assert_eq!(p.resolve(Some("-99999999999999999999")), 2);
        assert_eq!(p.offset(2), 10);
    }

    #[test]
    fn empty_listing_has_one_page() {
        let p = Paginator::new(0, POSTS_PER_PAGE);
        assert_eq!(p.num_pages(), 1);
        assert_eq!(p.resolve(Some("7")), 1);
        let page = p.page::<u8>(1, Vec::new());
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[tokio::test]
    async fn profile_splits_thirteen_posts_into_ten_and_three() {
        let store = Arc::new(MemoryStore::new());
        let author = store.create_user("leo").await.unwrap();
        write_posts(&store, &author, 13).await;
        let feed = feed(store.clone());

        let first = feed.profile_page("leo", None, None).await.unwrap();
        assert_eq!(first.page_obj.items.len(), 10);
        assert_eq!(first.post_count, 13);
        assert!(first.page_obj.has_next);
        assert_eq!(first.page_obj.items[0].text, "post 12");

        let second = feed.profile_page("leo", None, Some("2")).await.unwrap();
        assert_eq!(second.page_obj.items.len(), 3);
        assert!(second.page_obj.has_previous);
        assert!(!second.page_obj.has_next);
    }

    #[tokio::test]
    async fn unknown_group_and_user_are_not_found() {
        let feed = feed(Arc::new(MemoryStore::new()));
        assert!(matches!(
            feed.group_page("nope", None).await,
            Err(ServiceError::NotFound("group"))
        ));
        assert!(matches!(
            feed.profile_page("nobody", None, None).await,
            Err(ServiceError::NotFound("user"))
        ));
        assert!(matches!(
            feed.post_detail(Uuid::new_v4()).await,
            Err(ServiceError::NotFound("post"))
        ));
    }

    #[tokio::test]
    async fn follow_feed_only_shows_followed_authors() {
        let store = Arc::new(MemoryStore::new());
        let reader = store.create_user("mia").await.unwrap();
        let followed = store.create_user("leo").await.unwrap();
        let stranger = store.create_user("kai").await.unwrap();
        write_posts(&store, &followed, 2).await;
        write_posts(&store, &stranger, 3).await;
        let feed = feed(store.clone());

        let empty = feed.follow_page(reader.id, None).await.unwrap();
        assert!(empty.items.is_empty());
        assert_eq!(empty.num_pages, 1);

        store.create_follow(reader.id, followed.id).await.unwrap();
        let page = feed.follow_page(reader.id, None).await.unwrap();
        assert_eq!(page.count, 2);
        assert!(page
            .items
            .iter()
            .all(|p| p.author.as_ref().map(|a| a.id) == Some(followed.id)));
    }

    #[tokio::test]
    async fn group_page_lists_group_posts() {
        let store = Arc::new(MemoryStore::new());
        let author = store.create_user("leo").await.unwrap();
        let group = store
            .create_group(NewGroup {
                title: "Lizards".into(),
                slug: "lizards".into(),
                description: "Scales".into(),
            })
            .await
            .unwrap();
        store
            .create_post(NewPost {
                author_id: author.id,
                text: "in group".into(),
                group_id: Some(group.id),
                image: None,
            })
            .await
            .unwrap();
        write_posts(&store, &author, 1).await;

        let page = feed(store).group_page("lizards", None).await.unwrap();
        assert_eq!(page.group.title, "Lizards");
        assert_eq!(page.page_obj.count, 1);
        assert_eq!(page.page_obj.items[0].text, "in group");
    }

    #[tokio::test]
    async fn rendered_index_is_stale_until_cache_cleared() {
        let store = Arc::new(MemoryStore::new());
        let author = store.create_user("leo").await.unwrap();
        let post = store
            .create_post(NewPost {
                author_id: author.id,
                text: "soon gone".into(),
                group_id: None,
                image: None,
            })
            .await
            .unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = Arc::new(PageCache::new(Duration::seconds(DEFAULT_TTL_SECS), clock.clone()));
        let feed = FeedService::new(store.clone(), cache.clone());

        let before = feed.rendered_index(None).await.unwrap();
        store.delete_post(post.id).await.unwrap();
        let cached = feed.rendered_index(None).await.unwrap();
        assert_eq!(before, cached);

        cache.clear();
        let fresh = feed.rendered_index(None).await.unwrap();
        assert_ne!(before, fresh);

        store.create_post(NewPost {
            author_id: author.id,
            text: "new".into(),
            group_id: None,
            image: None,
        })
        .await
        .unwrap();
        clock.advance(Duration::seconds(DEFAULT_TTL_SECS));
        assert_ne!(fresh, feed.rendered_index(None).await.unwrap());
    }
}
