//! Database models for customers.

use crate::types::{CustomerId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a customer
#[derive(Debug, Clone)]
pub struct CustomerCreateDBRequest {
    pub owner_id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Database request for updating a customer. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct CustomerUpdateDBRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Database response for a customer
#[derive(Debug, Clone, FromRow)]
pub struct CustomerDBResponse {
    pub id: CustomerId,
    pub owner_id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
