pub mod feed_services;
pub mod follow_services;
pub mod group_services;
pub mod media_services;
pub mod page_cache;
pub mod post_services;
pub mod user_services;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use thiserror::Error;

use crate::dtos::{ApiResponse, FormErrors};
use crate::repositories::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(FormErrors),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("media error: {0}")]
    Media(#[from] std::io::Error),
    #[error("render error: {0}")]
    Render(#[from] serde_json::Error),
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::Validation(errors) => HttpResponse::BadRequest().json(ApiResponse {
                status: "error".to_string(),
                message: "Please correct the errors below".to_string(),
                data: Some(errors),
            }),
            ServiceError::NotFound(what) => {
                HttpResponse::NotFound().json(ApiResponse::error(format!("{what} not found")))
            }
            ServiceError::Conflict(message) => {
                HttpResponse::Conflict().json(ApiResponse::error(message.clone()))
            }
            other => {
                error!("request failed: {}", other);
                HttpResponse::InternalServerError().json(ApiResponse::error("Internal server error"))
            }
        }
    }
}
