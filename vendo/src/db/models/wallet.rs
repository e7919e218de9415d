//! Database models for the wallet ledger.
//!
//! The ledger is append-only: every credit or debit inserts a row carrying
//! the post-transaction balance, and a user's current balance is simply the
//! `balance_after` of their latest row.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// What caused a wallet ledger entry, stored as a Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "wallet_transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WalletTransactionType {
    AdminGrant,
    ReferralReward,
    SubscriptionPayment,
    Refund,
}

/// Database request for appending a ledger entry.
///
/// `amount` is signed: positive credits the wallet, negative debits it.
/// `source_id` deduplicates entries caused by the same external event;
/// a second insert with the same (type, source) pair is rejected by the
/// unique index and treated as an idempotent no-op by the handler.
#[derive(Debug, Clone)]
pub struct WalletTransactionCreateDBRequest {
    pub user_id: UserId,
    pub transaction_type: WalletTransactionType,
    pub amount: Decimal,
    pub description: Option<String>,
    pub source_id: Option<String>,
}

/// Database response for a wallet ledger entry
#[derive(Debug, Clone, FromRow)]
pub struct WalletTransactionDBResponse {
    pub id: i64,
    pub user_id: UserId,
    pub transaction_type: WalletTransactionType,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub description: Option<String>,
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
