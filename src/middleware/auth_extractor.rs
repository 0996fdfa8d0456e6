// src/middleware/auth_extractor.rs - bearer JWT -> authenticated user
use actix_web::error::ErrorForbidden;
use actix_web::http::StatusCode;
use actix_web::http::header::{AUTHORIZATION, LOCATION};
use actix_web::{Error, FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload, web};
use futures::future::{Ready, ready};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use log::{debug, warn};
use thiserror::Error;
use urlencoding::encode;
use uuid::Uuid;

use crate::models::user::{ADMIN_ROLE, JwtClaims};

pub const LOGIN_URL: &str = "/auth/login/";

/// Secret used to verify bearer tokens. Registered as app data.
#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn decode(&self, token: &str) -> Result<JwtClaims, jsonwebtoken::errors::Error> {
        let data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }
}

/// Hasil extractor - user yang sudah terautentikasi
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Option<String>,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

/// Rejection for protected routes: redirect to the login page, coming back
/// to `next` afterwards.
#[derive(Debug, Error)]
#[error("login required for {next}")]
pub struct LoginRequired {
    pub next: String,
}

pub fn login_redirect_url(next: &str) -> String {
    format!("{LOGIN_URL}?next={}", encode(next))
}

impl ResponseError for LoginRequired {
    fn status_code(&self) -> StatusCode {
        StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Found()
            .insert_header((LOCATION, login_redirect_url(&self.next)))
            .finish()
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, String> {
    let config = req
        .app_data::<web::Data<AuthConfig>>()
        .ok_or("auth config not registered")?;

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid header format")?;

    // Cek format Bearer token
    let token = header
        .strip_prefix("Bearer ")
        .ok_or("Invalid auth header format")?
        .trim();

    let claims = config
        .decode(token)
        .map_err(|e| format!("Invalid token: {e}"))?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|e| format!("Invalid UUID: {e}"))?;

    Ok(AuthenticatedUser {
        user_id,
        username: claims.username,
        role: claims.role,
    })
}

fn login_required(req: &HttpRequest, reason: String) -> Error {
    debug!("auth rejected on {}: {}", req.path(), reason);
    LoginRequired {
        next: req.path().to_string(),
    }
    .into()
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<AuthenticatedUser, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(|reason| login_required(req, reason)))
    }
}

/// Authenticated user holding the admin role. Others get 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequest for AdminUser {
    type Error = Error;
    type Future = Ready<Result<AdminUser, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(match authenticate(req) {
            Ok(user) if user.is_admin() => Ok(AdminUser(user)),
            Ok(user) => {
                warn!("user {} is not an admin ({})", user.username, req.path());
                Err(ErrorForbidden("Admin role required"))
            }
            Err(reason) => Err(login_required(req, reason)),
        })
    }
}
