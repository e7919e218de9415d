//! API request/response models for subscription plans.

use crate::db::models::plans::{PlanCreateDBRequest, PlanDBResponse, PlanUpdateDBRequest};
use crate::types::PlanId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanCreate {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub duration_days: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub duration_days: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PlanId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub duration_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PlanCreate> for PlanCreateDBRequest {
    fn from(create: PlanCreate) -> Self {
        Self {
            code: create.code,
            name: create.name,
            description: create.description,
            price: create.price,
            duration_days: create.duration_days,
        }
    }
}

impl From<PlanUpdate> for PlanUpdateDBRequest {
    fn from(update: PlanUpdate) -> Self {
        Self {
            name: update.name,
            description: update.description,
            price: update.price,
            duration_days: update.duration_days,
            is_active: update.is_active,
        }
    }
}

impl From<PlanDBResponse> for PlanResponse {
    fn from(db: PlanDBResponse) -> Self {
        Self {
            id: db.id,
            code: db.code,
            name: db.name,
            description: db.description,
            price: db.price,
            duration_days: db.duration_days,
            is_active: db.is_active,
            created_at: db.created_at,
        }
    }
}
