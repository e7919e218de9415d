//! Database repository for the wallet ledger.
//!
//! All balance changes funnel through [`Wallet::append`], which reads the
//! latest balance under a row lock and inserts the new ledger entry in the
//! same transaction. The `wallet_balance_non_negative` check constraint is
//! the final authority on overdrafts.

use crate::types::{UserId, abbrev_uuid};
use crate::db::{
    errors::Result,
    models::wallet::{WalletTransactionCreateDBRequest, WalletTransactionDBResponse, WalletTransactionType},
};
use rust_decimal::Decimal;
use sqlx::{Connection, PgConnection};
use tracing::instrument;

/// Filter for listing ledger entries
#[derive(Debug, Clone)]
pub struct WalletFilter {
    pub user_id: UserId,
    pub skip: i64,
    pub limit: i64,
}

impl WalletFilter {
    pub fn new(user_id: UserId, skip: i64, limit: i64) -> Self {
        Self { user_id, skip, limit }
    }
}

pub struct Wallet<'c> {
    db: &'c mut PgConnection,
}

/// Outcome of an append: either a fresh ledger entry or the entry a previous
/// attempt with the same source already wrote.
#[derive(Debug, Clone)]
pub enum AppendOutcome {
    Applied(WalletTransactionDBResponse),
    AlreadyApplied(WalletTransactionDBResponse),
}

impl AppendOutcome {
    pub fn into_inner(self) -> WalletTransactionDBResponse {
        match self {
            AppendOutcome::Applied(entry) | AppendOutcome::AlreadyApplied(entry) => entry,
        }
    }
}

impl<'c> Wallet<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// The user's current balance: `balance_after` of the latest entry, or
    /// zero for a wallet with no history.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn balance(&mut self, user_id: UserId) -> Result<Decimal> {
        let balance: Option<Decimal> = sqlx::query_scalar(
            "SELECT balance_after FROM wallet_transactions WHERE user_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(balance.unwrap_or(Decimal::ZERO))
    }

    /// Append a ledger entry, serialized per user via an advisory-style row
    /// lock on the latest entry.
    ///
    /// When the request carries a `source_id` that has already been recorded
    /// for the same transaction type, the existing entry is returned as
    /// [`AppendOutcome::AlreadyApplied`] and nothing is written.
    #[instrument(
        skip(self, request),
        fields(user_id = %abbrev_uuid(&request.user_id), transaction_type = ?request.transaction_type, amount = %request.amount),
        err
    )]
    pub async fn append(&mut self, request: &WalletTransactionCreateDBRequest) -> Result<AppendOutcome> {
        let mut tx = self.db.begin().await?;

        if let Some(source_id) = &request.source_id {
            let existing = sqlx::query_as::<_, WalletTransactionDBResponse>(
                "SELECT * FROM wallet_transactions WHERE transaction_type = $1 AND source_id = $2",
            )
            .bind(request.transaction_type)
            .bind(source_id)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(existing) = existing {
                return Ok(AppendOutcome::AlreadyApplied(existing));
            }
        }

        let latest: Option<Decimal> = sqlx::query_scalar(
            "SELECT balance_after FROM wallet_transactions WHERE user_id = $1 ORDER BY id DESC LIMIT 1 FOR UPDATE",
        )
        .bind(request.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let balance_after = latest.unwrap_or(Decimal::ZERO) + request.amount;

        let entry = sqlx::query_as::<_, WalletTransactionDBResponse>(
            r#"
            INSERT INTO wallet_transactions (user_id, transaction_type, amount, balance_after, description, source_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.transaction_type)
        .bind(request.amount)
        .bind(balance_after)
        .bind(&request.description)
        .bind(&request.source_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AppendOutcome::Applied(entry))
    }

    /// Total ledger entries for the filter's user, ignoring pagination.
    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id)), err)]
    pub async fn count(&mut self, filter: &WalletFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wallet_transactions WHERE user_id = $1")
            .bind(filter.user_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id)), err)]
    pub async fn list(&mut self, filter: &WalletFilter) -> Result<Vec<WalletTransactionDBResponse>> {
        let entries = sqlx::query_as::<_, WalletTransactionDBResponse>(
            "SELECT * FROM wallet_transactions WHERE user_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3",
        )
        .bind(filter.user_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use crate::test_utils::create_test_reseller;
    use sqlx::PgPool;

    fn grant(user_id: UserId, amount: Decimal) -> WalletTransactionCreateDBRequest {
        WalletTransactionCreateDBRequest {
            user_id,
            transaction_type: WalletTransactionType::AdminGrant,
            amount,
            description: Some("manual credit".to_string()),
            source_id: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_balance_tracks_ledger(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "walletuser").await;
        let mut wallet = Wallet::new(&mut conn);

        assert_eq!(wallet.balance(user.id).await.unwrap(), Decimal::ZERO);

        wallet.append(&grant(user.id, Decimal::new(10000, 2))).await.unwrap();
        let entry = wallet
            .append(&WalletTransactionCreateDBRequest {
                user_id: user.id,
                transaction_type: WalletTransactionType::SubscriptionPayment,
                amount: Decimal::new(-2500, 2),
                description: None,
                source_id: None,
            })
            .await
            .unwrap()
            .into_inner();

        assert_eq!(entry.balance_after, Decimal::new(7500, 2));
        assert_eq!(wallet.balance(user.id).await.unwrap(), Decimal::new(7500, 2));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_overdraft_rejected_by_check(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "pooruser").await;
        let mut wallet = Wallet::new(&mut conn);

        wallet.append(&grant(user.id, Decimal::new(1000, 2))).await.unwrap();

        let err = wallet
            .append(&WalletTransactionCreateDBRequest {
                user_id: user.id,
                transaction_type: WalletTransactionType::SubscriptionPayment,
                amount: Decimal::new(-5000, 2),
                description: None,
                source_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));

        // Balance unchanged after the failed debit
        assert_eq!(wallet.balance(user.id).await.unwrap(), Decimal::new(1000, 2));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_same_source_applies_once(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_reseller(&mut conn, "dedupuser").await;
        let mut wallet = Wallet::new(&mut conn);

        let request = WalletTransactionCreateDBRequest {
            user_id: user.id,
            transaction_type: WalletTransactionType::ReferralReward,
            amount: Decimal::new(10000, 2),
            description: Some("referral".to_string()),
            source_id: Some("referral-abc".to_string()),
        };

        let first = wallet.append(&request).await.unwrap();
        assert!(matches!(first, AppendOutcome::Applied(_)));

        let second = wallet.append(&request).await.unwrap();
        assert!(matches!(second, AppendOutcome::AlreadyApplied(_)));

        assert_eq!(wallet.balance(user.id).await.unwrap(), Decimal::new(10000, 2));
    }
}
