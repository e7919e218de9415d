//! Database models for products.

use crate::types::{ProductId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

/// Hard cap on stored product image URLs. Extra URLs are truncated, not rejected.
pub const MAX_PRODUCT_IMAGES: usize = 5;

/// Database request for creating a product
#[derive(Debug, Clone)]
pub struct ProductCreateDBRequest {
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_urls: Vec<String>,
}

/// Database request for updating a product. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub image_urls: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Database response for a product
#[derive(Debug, Clone, FromRow)]
pub struct ProductDBResponse {
    pub id: ProductId,
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_urls: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
