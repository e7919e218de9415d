//! Database repository for subscription plans.

use crate::types::{PlanId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::plans::{PlanCreateDBRequest, PlanDBResponse, PlanUpdateDBRequest},
};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing plans
#[derive(Debug, Clone)]
pub struct PlanFilter {
    /// When true, only active plans are returned.
    pub active_only: bool,
    pub skip: i64,
    pub limit: i64,
}

impl PlanFilter {
    pub fn new(active_only: bool, skip: i64, limit: i64) -> Self {
        Self { active_only, skip, limit }
    }
}

pub struct Plans<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Plans<'c> {
    type CreateRequest = PlanCreateDBRequest;
    type UpdateRequest = PlanUpdateDBRequest;
    type Response = PlanDBResponse;
    type Id = PlanId;
    type Filter = PlanFilter;

    #[instrument(skip(self, request), fields(code = %request.code), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let plan = sqlx::query_as::<_, PlanDBResponse>(
            r#"
            INSERT INTO plans (code, name, description, price, duration_days)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&request.code)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.price)
        .bind(request.duration_days)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(plan)
    }

    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let plan = sqlx::query_as::<_, PlanDBResponse>("SELECT * FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(plan)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let plans = sqlx::query_as::<_, PlanDBResponse>(
            r#"
            SELECT * FROM plans
            WHERE (NOT $1 OR is_active)
            ORDER BY price ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.active_only)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(plans)
    }

    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM plans WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(plan_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let plan = sqlx::query_as::<_, PlanDBResponse>(
            r#"
            UPDATE plans SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                duration_days = COALESCE($5, duration_days),
                is_active = COALESCE($6, is_active)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.price)
        .bind(request.duration_days)
        .bind(request.is_active)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(plan)
    }
}

impl<'c> Plans<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, code), err)]
    pub async fn get_by_code(&mut self, code: &str) -> Result<Option<PlanDBResponse>> {
        let plan = sqlx::query_as::<_, PlanDBResponse>("SELECT * FROM plans WHERE code = $1")
            .bind(code)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    fn plan_request(code: &str, price: Decimal) -> PlanCreateDBRequest {
        PlanCreateDBRequest {
            code: code.to_string(),
            name: format!("Plan {code}"),
            description: None,
            price,
            duration_days: 30,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_code_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Plans::new(&mut conn);

        repo.create(&plan_request("starter", Decimal::new(9900, 2))).await.unwrap();
        let err = repo.create(&plan_request("starter", Decimal::new(19900, 2))).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_active_only_listing(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Plans::new(&mut conn);

        repo.create(&plan_request("starter", Decimal::new(9900, 2))).await.unwrap();
        let pro = repo.create(&plan_request("pro", Decimal::new(19900, 2))).await.unwrap();
        repo.update(
            pro.id,
            &PlanUpdateDBRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let active = repo.list(&PlanFilter::new(true, 0, 50)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].code, "starter");

        let all = repo.list(&PlanFilter::new(false, 0, 50)).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_by_code(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Plans::new(&mut conn);

        let created = repo.create(&plan_request("growth", Decimal::new(49900, 2))).await.unwrap();
        let found = repo.get_by_code("growth").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(repo.get_by_code("missing").await.unwrap().is_none());
    }
}
