// src/handlers/post_handlers.rs - listings, post detail, create/edit, comments
use actix_web::{HttpResponse, get, post, web};
use log::debug;
use uuid::Uuid;

use crate::AppState;
use crate::dtos::ApiResponse;
use crate::dtos::post_dtos::{CommentForm, PostForm};
use crate::handlers::{PageQuery, post_url, profile_url, redirect};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::services::ServiceError;
use crate::services::post_services::EditOutcome;

/// GET / - cached for the page cache TTL
#[get("/")]
pub async fn index(
    app_state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ServiceError> {
    let body = app_state.feed.rendered_index(query.page.as_deref()).await?;
    Ok(HttpResponse::Ok()
        .content_type(mime::APPLICATION_JSON)
        .body(body))
}

#[get("/group/{slug}/")]
pub async fn group_posts(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ServiceError> {
    let slug = path.into_inner();
    let page = app_state.feed.group_page(&slug, query.page.as_deref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Group posts retrieved successfully", page)))
}

#[get("/posts/{post_id}/")]
pub async fn post_detail(
    app_state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let detail = app_state.feed.post_detail(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Post retrieved successfully", detail)))
}

/// POST /create/ - redirects to the author's profile
#[post("/create/")]
pub async fn post_create(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<PostForm>,
) -> Result<HttpResponse, ServiceError> {
    app_state.users.sync_user(user.user_id, &user.username).await?;
    app_state
        .posts
        .create_post(user.user_id, body.into_inner())
        .await?;
    Ok(redirect(profile_url(&user.username)))
}

/// POST /posts/{post_id}/edit/ - non-authors are sent back to their own profile
#[post("/posts/{post_id}/edit/")]
pub async fn post_edit(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<PostForm>,
) -> Result<HttpResponse, ServiceError> {
    app_state.users.sync_user(user.user_id, &user.username).await?;
    let post_id = path.into_inner();
    match app_state
        .posts
        .edit_post(user.user_id, post_id, body.into_inner())
        .await?
    {
        EditOutcome::Updated(post) => Ok(redirect(post_url(post.id))),
        EditOutcome::Denied => Ok(redirect(profile_url(&user.username))),
    }
}

#[post("/posts/{post_id}/comment/")]
pub async fn add_comment(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<CommentForm>,
) -> Result<HttpResponse, ServiceError> {
    app_state.users.sync_user(user.user_id, &user.username).await?;
    let post_id = path.into_inner();
    app_state
        .posts
        .add_comment(user.user_id, post_id, body.into_inner())
        .await?;
    Ok(redirect(post_url(post_id)))
}

/// GET /follow/ - posts by followed authors
#[get("/follow/")]
pub async fn follow_index(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ServiceError> {
    debug!("follow feed for {}", user.username);
    app_state.users.sync_user(user.user_id, &user.username).await?;
    let page = app_state
        .feed
        .follow_page(user.user_id, query.page.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Posts by followed authors", page)))
}
