//! Database models for the referral program.

use crate::types::{ReferralId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Referral reward status, stored as a Postgres enum.
///
/// A referral starts `pending` when the referee registers with a code and
/// flips to `rewarded` exactly once, on the referee's first subscription
/// activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "referral_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    Rewarded,
}

/// Database request for recording a referral at registration time
#[derive(Debug, Clone)]
pub struct ReferralCreateDBRequest {
    pub referrer_id: UserId,
    pub referee_id: UserId,
}

/// Database response for a referral
#[derive(Debug, Clone, FromRow)]
pub struct ReferralDBResponse {
    pub id: ReferralId,
    pub referrer_id: UserId,
    pub referee_id: UserId,
    pub status: ReferralStatus,
    pub reward_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub rewarded_at: Option<DateTime<Utc>>,
}
