pub mod group_handlers;
pub mod media_handlers;
pub mod post_handlers;
pub mod profile_handlers;

use actix_web::http::header::LOCATION;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use urlencoding::encode;
use uuid::Uuid;

/// `?page=` as sent by the client; resolved by the paginator.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

pub fn redirect(location: String) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((LOCATION, location))
        .finish()
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", encode(username))
}

pub fn post_url(post_id: Uuid) -> String {
    format!("/posts/{post_id}/")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(post_handlers::index)
        .service(post_handlers::group_posts)
        .service(post_handlers::post_detail)
        .service(post_handlers::post_create)
        .service(post_handlers::post_edit)
        .service(post_handlers::add_comment)
        .service(post_handlers::follow_index)
        .service(profile_handlers::profile)
        .service(profile_handlers::profile_follow)
        .service(profile_handlers::profile_unfollow)
        .service(group_handlers::list_groups)
        .service(group_handlers::create_group)
        .service(group_handlers::clear_cache)
        .service(media_handlers::serve_post_image);
}
