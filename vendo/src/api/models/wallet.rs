//! API request/response models for the wallet.

use super::pagination::Pagination;
use crate::db::models::wallet::{WalletTransactionDBResponse, WalletTransactionType};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Admin request to credit a reseller's wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletGrantRequest {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    /// Amount to credit; must be strictly positive.
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletBalanceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String)]
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletTransactionResponse {
    pub id: i64,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub transaction_type: WalletTransactionType,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub balance_after: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for listing wallet transactions
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListWalletTransactionsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

impl From<WalletTransactionDBResponse> for WalletTransactionResponse {
    fn from(db: WalletTransactionDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            transaction_type: db.transaction_type,
            amount: db.amount,
            balance_after: db.balance_after,
            description: db.description,
            created_at: db.created_at,
        }
    }
}
