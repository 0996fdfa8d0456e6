// src/handlers/profile_handlers.rs - author profile, follow / unfollow
use actix_web::{HttpResponse, get, post, web};

use crate::AppState;
use crate::dtos::ApiResponse;
use crate::handlers::{PageQuery, profile_url, redirect};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::services::ServiceError;

/// GET /profile/{username}/
/// `following` is only ever true for a logged-in viewer
#[get("/profile/{username}/")]
pub async fn profile(
    app_state: web::Data<AppState>,
    viewer: Option<AuthenticatedUser>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ServiceError> {
    let username = path.into_inner();
    let profile = app_state
        .feed
        .profile_page(
            &username,
            viewer.as_ref().map(|v| v.user_id),
            query.page.as_deref(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Profile retrieved successfully", profile)))
}

#[post("/profile/{username}/follow/")]
pub async fn profile_follow(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let username = path.into_inner();
    app_state.users.sync_user(user.user_id, &user.username).await?;
    app_state.follows.follow(user.user_id, &username).await?;
    Ok(redirect(profile_url(&username)))
}

#[post("/profile/{username}/unfollow/")]
pub async fn profile_unfollow(
    app_state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let username = path.into_inner();
    app_state.users.sync_user(user.user_id, &user.username).await?;
    app_state.follows.unfollow(user.user_id, &username).await?;
    Ok(redirect(profile_url(&username)))
}
