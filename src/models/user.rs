use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Akun penulis. Dikelola oleh subsistem auth; layanan ini hanya membaca
/// `id` dan `username`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

/// Versi yang dikirim ke client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for UserPublic {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// JWT claims yang dibawa bearer token
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// subject / user id
    pub sub: String,
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: u64,
}

pub const ADMIN_ROLE: &str = "admin";
