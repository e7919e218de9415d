//! Database repository for payment transactions.

use crate::types::{PaymentTransactionId, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::payments::{PaymentCreateDBRequest, PaymentDBResponse, PaymentStatus},
};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing payment transactions
#[derive(Debug, Clone)]
pub struct PaymentFilter {
    pub user_id: Option<UserId>,
    pub status: Option<PaymentStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl PaymentFilter {
    pub fn new(user_id: Option<UserId>, skip: i64, limit: i64) -> Self {
        Self {
            user_id,
            status: None,
            skip,
            limit,
        }
    }
}

/// Status changes applied by the confirmation flow.
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdateDBRequest {
    pub status: Option<PaymentStatus>,
    pub gateway_order_id: Option<String>,
}

pub struct Payments<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Payments<'c> {
    type CreateRequest = PaymentCreateDBRequest;
    type UpdateRequest = PaymentUpdateDBRequest;
    type Response = PaymentDBResponse;
    type Id = PaymentTransactionId;
    type Filter = PaymentFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), amount = %request.amount), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(
            r#"
            INSERT INTO payment_transactions
                (user_id, plan_id, subscription_id, gateway_order_id, amount, wallet_amount, provider)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.plan_id)
        .bind(request.subscription_id)
        .bind(&request.gateway_order_id)
        .bind(request.amount)
        .bind(request.wallet_amount)
        .bind(&request.provider)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(payment)
    }

    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>("SELECT * FROM payment_transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(payment)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let payments = sqlx::query_as::<_, PaymentDBResponse>(
            r#"
            SELECT * FROM payment_transactions
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::payment_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(payments)
    }

    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM payment_transactions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(payment_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(
            r#"
            UPDATE payment_transactions SET
                status = COALESCE($2, status),
                gateway_order_id = COALESCE($3, gateway_order_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.status)
        .bind(&request.gateway_order_id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(payment)
    }
}

impl<'c> Payments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Total rows matching the filter, ignoring pagination.
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &PaymentFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM payment_transactions
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::payment_status IS NULL OR status = $2)
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }

    /// Look up a payment by the order id assigned by the payment gateway.
    /// This is how webhook deliveries find their transaction.
    #[instrument(skip(self, gateway_order_id), err)]
    pub async fn get_by_gateway_order_id(&mut self, gateway_order_id: &str) -> Result<Option<PaymentDBResponse>> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(
            "SELECT * FROM payment_transactions WHERE gateway_order_id = $1",
        )
        .bind(gateway_order_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(payment)
    }
}
