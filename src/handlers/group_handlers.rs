// src/handlers/group_handlers.rs - group list and admin actions
use actix_web::{HttpResponse, get, post, web};
use log::info;

use crate::AppState;
use crate::dtos::ApiResponse;
use crate::dtos::group_dtos::GroupForm;
use crate::middleware::auth_extractor::AdminUser;
use crate::services::ServiceError;

/// GET /groups/ - choices for the post form
#[get("/groups/")]
pub async fn list_groups(app_state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let groups = app_state.groups.list_groups().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Groups retrieved successfully", groups)))
}

#[post("/admin/groups/")]
pub async fn create_group(
    app_state: web::Data<AppState>,
    _admin: AdminUser,
    body: web::Json<GroupForm>,
) -> Result<HttpResponse, ServiceError> {
    let group = app_state.groups.create_group(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success("Group created", group)))
}

#[post("/admin/cache/clear/")]
pub async fn clear_cache(app_state: web::Data<AppState>, admin: AdminUser) -> HttpResponse {
    app_state.cache.clear();
    info!("page cache cleared by {}", admin.0.username);
    HttpResponse::NoContent().finish()
}
