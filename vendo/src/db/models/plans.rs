//! Database models for subscription plans.

use crate::types::PlanId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

/// Database request for creating a plan
#[derive(Debug, Clone)]
pub struct PlanCreateDBRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub duration_days: i32,
}

/// Database request for updating a plan. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct PlanUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub duration_days: Option<i32>,
    pub is_active: Option<bool>,
}

/// Database response for a plan
#[derive(Debug, Clone, FromRow)]
pub struct PlanDBResponse {
    pub id: PlanId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub duration_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
