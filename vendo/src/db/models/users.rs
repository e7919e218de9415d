//! Database models for users.

use crate::api::models::users::{Role, UserUpdate};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub business_name: Option<String>,
    pub phone: Option<String>,
    pub is_admin: bool,
    pub role: Role,
    pub auth_source: String,
    pub password_hash: Option<String>,
    pub referral_code: Option<String>,
    pub referred_by: Option<UserId>,
}

/// Database request for updating a user
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub display_name: Option<String>,
    pub business_name: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
}

impl From<UserUpdate> for UserUpdateDBRequest {
    fn from(update: UserUpdate) -> Self {
        Self {
            display_name: update.display_name,
            business_name: update.business_name,
            phone: update.phone,
            password_hash: None, // Regular updates don't include password changes
        }
    }
}

/// Database response for a user
#[derive(Debug, Clone, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub business_name: Option<String>,
    pub phone: Option<String>,
    pub is_admin: bool,
    pub role: Role,
    pub auth_source: String,
    pub password_hash: Option<String>,
    pub referral_code: Option<String>,
    pub referred_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
