// src/services/group_services.rs - group administration
use std::sync::{Arc, LazyLock};

use log::info;
use regex::Regex;

use crate::dtos::group_dtos::GroupForm;
use crate::dtos::{FormErrors, REQUIRED};
use crate::models::group::{Group, NewGroup};
use crate::repositories::{EntityStore, StoreError};
use crate::services::ServiceError;

pub const TITLE_MAX_CHARS: usize = 200;
pub const INVALID_SLUG: &str =
    "Enter a valid slug consisting of letters, numbers, underscores or hyphens.";
pub const DUPLICATE_SLUG: &str = "Group with this Slug already exists.";

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug pattern compiles"));

#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn EntityStore>,
}

impl GroupService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    fn check(form: &GroupForm) -> FormErrors {
        let mut errors = FormErrors::new();
        let title = form.title.trim();
        let title_len = title.chars().count();
        if title.is_empty() {
            errors.add("title", REQUIRED);
        } else if title_len > TITLE_MAX_CHARS {
            errors.add(
                "title",
                format!("Ensure this value has at most {TITLE_MAX_CHARS} characters (it has {title_len})."),
            );
        }

        let slug = form.slug.trim();
        if slug.is_empty() {
            errors.add("slug", REQUIRED);
        } else if !SLUG_RE.is_match(slug) {
            errors.add("slug", INVALID_SLUG);
        }

        if form.description.trim().is_empty() {
            errors.add("description", REQUIRED);
        }
        errors
    }

    pub async fn create_group(&self, form: GroupForm) -> Result<Group, ServiceError> {
        Self::check(&form).into_result().map_err(ServiceError::Validation)?;

        let slug = form.slug.trim().to_string();
        if self.store.find_group_by_slug(&slug).await?.is_some() {
            return Err(ServiceError::Validation(FormErrors::single("slug", DUPLICATE_SLUG)));
        }

        let group = self
            .store
            .create_group(NewGroup {
                title: form.title.trim().to_string(),
                slug,
                description: form.description.trim().to_string(),
            })
            .await
            .map_err(|e| match e {
                // lost a race with a concurrent insert of the same slug
                StoreError::Conflict(_) => {
                    ServiceError::Validation(FormErrors::single("slug", DUPLICATE_SLUG))
                }
                other => ServiceError::Store(other),
            })?;
        info!("group {} ({}) created", group.title, group.slug);
        Ok(group)
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, ServiceError> {
        Ok(self.store.list_groups().await?)
    }
}
