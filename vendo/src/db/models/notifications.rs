//! Database models for in-app notifications.

use crate::types::{NotificationId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a notification
#[derive(Debug, Clone)]
pub struct NotificationCreateDBRequest {
    pub user_id: UserId,
    pub kind: String,
    pub title: String,
    pub body: String,
}

/// Database response for a notification
#[derive(Debug, Clone, FromRow)]
pub struct NotificationDBResponse {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
