// src/services/post_services.rs - create/edit posts, add comments
use std::sync::Arc;

use log::{info, warn};
use uuid::Uuid;

use crate::dtos::post_dtos::{CommentForm, PostForm};
use crate::dtos::{FormErrors, REQUIRED};
use crate::models::comment::{Comment, NewComment};
use crate::models::post::{NewPost, Post, PostChanges};
use crate::repositories::{EntityStore, StoreError};
use crate::services::ServiceError;
use crate::services::media_services::{DecodedImage, MediaStorage, decode_image};

pub const INVALID_GROUP: &str = "Select a valid choice. That choice is not one of the available choices.";

/// Result of an edit attempt. A non-author gets `Denied` and nothing changes.
#[derive(Debug)]
pub enum EditOutcome {
    Updated(Post),
    Denied,
}

struct ValidPost {
    text: String,
    group_id: Option<Uuid>,
    image: Option<DecodedImage>,
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn EntityStore>,
    media: MediaStorage,
}

impl PostService {
    pub fn new(store: Arc<dyn EntityStore>, media: MediaStorage) -> Self {
        Self { store, media }
    }

    /// Collects every field error before failing.
    async fn validate(&self, form: PostForm) -> Result<ValidPost, ServiceError> {
        let mut errors = FormErrors::new();

        let text = form.text.trim().to_string();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        if let Some(group_id) = form.group {
            if self.store.find_group(group_id).await?.is_none() {
                errors.add("group", INVALID_GROUP);
            }
        }

        let image = match form.image.as_ref().map(decode_image) {
            Some(Ok(image)) => Some(image),
            Some(Err(message)) => {
                errors.add("image", message);
                None
            }
            None => None,
        };

        errors.into_result().map_err(ServiceError::Validation)?;
        Ok(ValidPost {
            text,
            group_id: form.group,
            image,
        })
    }

    fn store_image(&self, image: Option<&DecodedImage>) -> Result<Option<String>, ServiceError> {
        match image {
            Some(image) => Ok(Some(self.media.save(image)?)),
            None => Ok(None),
        }
    }

    /// A freshly stored image is removed again when the write did not go through.
    fn keep_image_if<T>(
        &self,
        result: Result<T, StoreError>,
        uploaded: Option<&str>,
    ) -> Result<T, ServiceError> {
        result.map_err(|e| {
            if let Some(reference) = uploaded {
                self.media.remove(reference);
            }
            e.into()
        })
    }

    pub async fn create_post(&self, author_id: Uuid, form: PostForm) -> Result<Post, ServiceError> {
        let valid = self.validate(form).await?;
        let image = self.store_image(valid.image.as_ref())?;
        let created = self
            .store
            .create_post(NewPost {
                author_id,
                text: valid.text,
                group_id: valid.group_id,
                image: image.clone(),
            })
            .await;
        let post = self.keep_image_if(created, image.as_deref())?;
        info!("post {} created by {}", post.id, author_id);
        Ok(post)
    }

    /// Only the author may edit. `pub_date` and author never change; the image
    /// is kept unless a new one is uploaded.
    pub async fn edit_post(
        &self,
        requester_id: Uuid,
        post_id: Uuid,
        form: PostForm,
    ) -> Result<EditOutcome, ServiceError> {
        let current = self
            .store
            .get_post(post_id)
            .await?
            .ok_or(ServiceError::NotFound("post"))?
            .post;
        if current.author_id != Some(requester_id) {
            warn!("user {} may not edit post {}", requester_id, post_id);
            return Ok(EditOutcome::Denied);
        }

        let valid = self.validate(form).await?;
        let uploaded = self.store_image(valid.image.as_ref())?;
        let image = uploaded.clone().or(current.image);
        let saved = self
            .store
            .update_post(
                post_id,
                PostChanges {
                    text: valid.text,
                    group_id: valid.group_id,
                    image,
                },
            )
            .await;
        let Some(updated) = self.keep_image_if(saved, uploaded.as_deref())? else {
            if let Some(reference) = uploaded.as_deref() {
                self.media.remove(reference);
            }
            return Err(ServiceError::NotFound("post"));
        };
        info!("post {} edited", post_id);
        Ok(EditOutcome::Updated(updated))
    }

    pub async fn add_comment(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        form: CommentForm,
    ) -> Result<Comment, ServiceError> {
        if self.store.get_post(post_id).await?.is_none() {
            return Err(ServiceError::NotFound("post"));
        }
        let text = form.text.trim();
        if text.is_empty() {
            return Err(ServiceError::Validation(FormErrors::single("text", REQUIRED)));
        }
        let comment = self
            .store
            .create_comment(NewComment {
                post_id,
                author_id,
                text: text.to_string(),
            })
            .await?;
        info!("comment {} added to post {}", comment.id, post_id);
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use base64::{Engine as _, engine::general_purpose};

    use super::*;
    use crate::dtos::post_dtos::ImageUpload;
    use crate::models::group::NewGroup;
    use crate::models::user::User;
    use crate::repositories::MemoryStore;

    const GIF_BYTES: &[u8] = b"GIF89a\x01\x00\x01\x00\x00\x00\x00";

    async fn setup() -> (Arc<MemoryStore>, PostService, User) {
        let store = Arc::new(MemoryStore::new());
        let author = store.create_user("leo").await.unwrap();
        let media = MediaStorage::new(std::env::temp_dir().join(format!("media-{}", Uuid::new_v4())));
        let service = PostService::new(store.clone(), media);
        (store, service, author)
    }

    fn form(text: &str) -> PostForm {
        PostForm {
            text: text.into(),
            ..PostForm::default()
        }
    }

    fn validation_errors(result: Result<impl std::fmt::Debug, ServiceError>) -> FormErrors {
        match result {
            Err(ServiceError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_requires_text() {
        let (store, service, author) = setup().await;

        let errors = validation_errors(service.create_post(author.id, form("   ")).await);
        assert_eq!(errors.field("text"), [REQUIRED]);
        assert_eq!(store.count_posts(crate::repositories::PostScope::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn create_reports_every_bad_field() {
        let (_, service, author) = setup().await;
        let bad = PostForm {
            text: String::new(),
            group: Some(Uuid::new_v4()),
            image: Some(ImageUpload {
                file_name: "x.txt".into(),
                content_type: "text/plain".into(),
                image_data: String::new(),
            }),
        };

        let errors = validation_errors(service.create_post(author.id, bad).await);
        assert_eq!(errors.field("text"), [REQUIRED]);
        assert_eq!(errors.field("group"), [INVALID_GROUP]);
        assert_eq!(errors.field("image").len(), 1);
    }

    #[tokio::test]
    async fn create_stores_group_and_image() {
        let (store, service, author) = setup().await;
        let group = store
            .create_group(NewGroup {
                title: "Lizards".into(),
                slug: "lizards".into(),
                description: "Scales".into(),
            })
            .await
            .unwrap();
        let post_form = PostForm {
            text: "Hello".into(),
            group: Some(group.id),
            image: Some(ImageUpload {
                file_name: "small.gif".into(),
                content_type: "image/gif".into(),
                image_data: general_purpose::STANDARD.encode(GIF_BYTES),
            }),
        };

        let post = service.create_post(author.id, post_form).await.unwrap();
        assert_eq!(post.author_id, Some(author.id));
        assert_eq!(post.group_id, Some(group.id));
        let image = post.image.unwrap();
        assert!(image.starts_with("posts/") && image.ends_with(".gif"));
    }

    #[tokio::test]
    async fn failed_write_removes_the_uploaded_image() {
        let store = Arc::new(MemoryStore::new());
        let root = std::env::temp_dir().join(format!("media-{}", Uuid::new_v4()));
        let service = PostService::new(store.clone(), MediaStorage::new(&root));
        let post_form = PostForm {
            text: "Hello".into(),
            image: Some(ImageUpload {
                file_name: "small.gif".into(),
                content_type: "image/gif".into(),
                image_data: general_purpose::STANDARD.encode(GIF_BYTES),
            }),
            ..PostForm::default()
        };

        // nobody with this id exists, so the store rejects the post
        let result = service.create_post(Uuid::new_v4(), post_form).await;
        assert!(matches!(
            result,
            Err(ServiceError::Store(StoreError::MissingReference("author")))
        ));
        let left: Vec<_> = std::fs::read_dir(root.join("posts")).unwrap().collect();
        assert!(left.is_empty());
    }

    #[tokio::test]
    async fn edit_by_author_keeps_date_and_image() {
        let (store, service, author) = setup().await;
        let post = store
            .create_post(NewPost {
                author_id: author.id,
                text: "draft".into(),
                group_id: None,
                image: Some("posts/old.png".into()),
            })
            .await
            .unwrap();

        let outcome = service.edit_post(author.id, post.id, form("final")).await.unwrap();
        let EditOutcome::Updated(updated) = outcome else {
            panic!("author edit was denied");
        };
        assert_eq!(updated.text, "final");
        assert_eq!(updated.pub_date, post.pub_date);
        assert_eq!(updated.author_id, Some(author.id));
        assert_eq!(updated.image.as_deref(), Some("posts/old.png"));
    }

    #[tokio::test]
    async fn edit_by_stranger_is_denied_and_changes_nothing() {
        let (store, service, author) = setup().await;
        let stranger = store.create_user("kai").await.unwrap();
        let post = service.create_post(author.id, form("mine")).await.unwrap();

        let outcome = service.edit_post(stranger.id, post.id, form("hijacked")).await.unwrap();
        assert!(matches!(outcome, EditOutcome::Denied));

        let stored = store.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(stored.post.text, "mine");
    }

    #[tokio::test]
    async fn edit_with_empty_text_leaves_post_unchanged() {
        let (store, service, author) = setup().await;
        let post = service.create_post(author.id, form("keep me")).await.unwrap();

        let errors = validation_errors(service.edit_post(author.id, post.id, form("")).await);
        assert_eq!(errors.field("text"), [REQUIRED]);
        assert_eq!(store.get_post(post.id).await.unwrap().unwrap().post.text, "keep me");
    }

    #[tokio::test]
    async fn edit_unknown_post_is_not_found() {
        let (_, service, author) = setup().await;
        assert!(matches!(
            service.edit_post(author.id, Uuid::new_v4(), form("x")).await,
            Err(ServiceError::NotFound("post"))
        ));
    }

    #[tokio::test]
    async fn comments_need_text_and_an_existing_post() {
        let (store, service, author) = setup().await;
        let post = service.create_post(author.id, form("topic")).await.unwrap();

        assert!(matches!(
            service
                .add_comment(author.id, Uuid::new_v4(), CommentForm { text: "hi".into() })
                .await,
            Err(ServiceError::NotFound("post"))
        ));
        let errors = validation_errors(
            service
                .add_comment(author.id, post.id, CommentForm::default())
                .await,
        );
        assert_eq!(errors.field("text"), [REQUIRED]);

        let comment = service
            .add_comment(author.id, post.id, CommentForm { text: " nice ".into() })
            .await
            .unwrap();
        assert_eq!(comment.text, "nice");
        assert_eq!(comment.author_id, author.id);
        assert_eq!(store.list_comments(post.id).await.unwrap().len(), 1);
    }
}
