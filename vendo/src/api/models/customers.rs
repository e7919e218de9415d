//! API request/response models for customers.

use super::pagination::Pagination;
use crate::db::models::customers::{CustomerCreateDBRequest, CustomerDBResponse, CustomerUpdateDBRequest};
use crate::types::{CustomerId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerCreate {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CustomerId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters for listing customers
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListCustomersQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

impl CustomerCreate {
    pub fn into_db_request(self, owner_id: UserId) -> CustomerCreateDBRequest {
        CustomerCreateDBRequest {
            owner_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            notes: self.notes,
        }
    }
}

impl From<CustomerUpdate> for CustomerUpdateDBRequest {
    fn from(update: CustomerUpdate) -> Self {
        Self {
            name: update.name,
            email: update.email,
            phone: update.phone,
            address: update.address,
            notes: update.notes,
        }
    }
}

impl From<CustomerDBResponse> for CustomerResponse {
    fn from(db: CustomerDBResponse) -> Self {
        Self {
            id: db.id,
            owner_id: db.owner_id,
            name: db.name,
            email: db.email,
            phone: db.phone,
            address: db.address,
            notes: db.notes,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
