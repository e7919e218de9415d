//! Database repository for customers.

use crate::types::{CustomerId, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::customers::{CustomerCreateDBRequest, CustomerDBResponse, CustomerUpdateDBRequest},
};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing customers. `owner_id = None` lists across all owners
/// (admin scope); resellers always filter by their own id.
#[derive(Debug, Clone)]
pub struct CustomerFilter {
    pub owner_id: Option<UserId>,
    pub skip: i64,
    pub limit: i64,
}

impl CustomerFilter {
    pub fn new(owner_id: Option<UserId>, skip: i64, limit: i64) -> Self {
        Self { owner_id, skip, limit }
    }
}

pub struct Customers<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Customers<'c> {
    type CreateRequest = CustomerCreateDBRequest;
    type UpdateRequest = CustomerUpdateDBRequest;
    type Response = CustomerDBResponse;
    type Id = CustomerId;
    type Filter = CustomerFilter;

    #[instrument(skip(self, request), fields(owner_id = %abbrev_uuid(&request.owner_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let customer = sqlx::query_as::<_, CustomerDBResponse>(
            r#"
            INSERT INTO customers (owner_id, name, email, phone, address, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(request.owner_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.address)
        .bind(&request.notes)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(customer)
    }

    #[instrument(skip(self), fields(customer_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let customer = sqlx::query_as::<_, CustomerDBResponse>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(customer)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let customers = sqlx::query_as::<_, CustomerDBResponse>(
            r#"
            SELECT * FROM customers
            WHERE ($1::uuid IS NULL OR owner_id = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.owner_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(customers)
    }

    #[instrument(skip(self), fields(customer_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(customer_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let customer = sqlx::query_as::<_, CustomerDBResponse>(
            r#"
            UPDATE customers SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                address = COALESCE($5, address),
                notes = COALESCE($6, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.address)
        .bind(&request.notes)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(customer)
    }
}

impl<'c> Customers<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Total rows matching the filter, ignoring pagination.
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &CustomerFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE ($1::uuid IS NULL OR owner_id = $1)")
            .bind(filter.owner_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_reseller;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_get_customer(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_test_reseller(&mut conn, "owner1").await;
        let mut repo = Customers::new(&mut conn);

        let created = repo
            .create(&CustomerCreateDBRequest {
                owner_id: owner.id,
                name: "Acme Stores".to_string(),
                email: Some("buyer@acme.example".to_string()),
                phone: None,
                address: None,
                notes: None,
            })
            .await
            .unwrap();

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Acme Stores");
        assert_eq!(fetched.owner_id, owner.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_is_owner_scoped(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner_a = create_test_reseller(&mut conn, "owner_a").await;
        let owner_b = create_test_reseller(&mut conn, "owner_b").await;
        let mut repo = Customers::new(&mut conn);

        for (owner, name) in [(owner_a.id, "A1"), (owner_a.id, "A2"), (owner_b.id, "B1")] {
            repo.create(&CustomerCreateDBRequest {
                owner_id: owner,
                name: name.to_string(),
                email: None,
                phone: None,
                address: None,
                notes: None,
            })
            .await
            .unwrap();
        }

        let scoped = repo.list(&CustomerFilter::new(Some(owner_a.id), 0, 50)).await.unwrap();
        assert_eq!(scoped.len(), 2);
        assert!(scoped.iter().all(|c| c.owner_id == owner_a.id));

        let all = repo.list(&CustomerFilter::new(None, 0, 50)).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_missing_customer_is_not_found(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Customers::new(&mut conn);

        let err = repo
            .update(uuid::Uuid::new_v4(), &CustomerUpdateDBRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }
}
