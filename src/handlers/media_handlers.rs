// src/handlers/media_handlers.rs
use actix_web::{HttpResponse, get, web};

use crate::AppState;
use crate::dtos::ApiResponse;
use crate::services::ServiceError;

/// GET /media/posts/{file_name}
/// Serve uploaded post images (public endpoint)
#[get("/media/posts/{file_name}")]
pub async fn serve_post_image(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    match app_state.media.open(&path.into_inner())? {
        Some((data, content_type)) => Ok(HttpResponse::Ok().content_type(content_type).body(data)),
        None => Ok(HttpResponse::NotFound().json(ApiResponse::error("Image not found"))),
    }
}
