//! API request/response models for products.

use super::pagination::Pagination;
use crate::db::models::products::{ProductCreateDBRequest, ProductDBResponse, ProductUpdateDBRequest};
use crate::types::{ProductId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductCreate {
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    /// Image URLs; anything past the first five is silently dropped.
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub image_urls: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ProductId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub stock: i32,
    pub image_urls: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters for listing products
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListProductsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Filter by active flag
    pub is_active: Option<bool>,
}

impl ProductCreate {
    pub fn into_db_request(self, owner_id: UserId) -> ProductCreateDBRequest {
        ProductCreateDBRequest {
            owner_id,
            name: self.name,
            description: self.description,
            sku: self.sku,
            price: self.price,
            stock: self.stock,
            image_urls: self.image_urls,
        }
    }
}

impl From<ProductUpdate> for ProductUpdateDBRequest {
    fn from(update: ProductUpdate) -> Self {
        Self {
            name: update.name,
            description: update.description,
            sku: update.sku,
            price: update.price,
            stock: update.stock,
            image_urls: update.image_urls,
            is_active: update.is_active,
        }
    }
}

impl From<ProductDBResponse> for ProductResponse {
    fn from(db: ProductDBResponse) -> Self {
        Self {
            id: db.id,
            owner_id: db.owner_id,
            name: db.name,
            description: db.description,
            sku: db.sku,
            price: db.price,
            stock: db.stock,
            image_urls: db.image_urls,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
