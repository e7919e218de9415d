//! Database models for password reset tokens.
//!
//! Only a hash of the token is stored; the plaintext token lives solely in
//! the reset email.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database request for creating a reset token
#[derive(Debug, Clone)]
pub struct PasswordResetTokenCreateDBRequest {
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Database response for a reset token
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetTokenDBResponse {
    pub id: Uuid,
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetTokenDBResponse {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}
