//! Database repository for orders and their line items.
//!
//! Order creation inserts the order and all items in one transaction, with
//! totals computed server-side from the line items so the stored subtotal
//! always matches the stored lines.

use crate::types::{OrderId, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::orders::{
        OrderCreateDBRequest, OrderDBResponse, OrderItemDBResponse, OrderStatus,
    },
};
use rust_decimal::Decimal;
use sqlx::{Connection, PgConnection};
use tracing::instrument;

/// Filter for listing orders
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub owner_id: Option<UserId>,
    pub status: Option<OrderStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl OrderFilter {
    pub fn new(owner_id: Option<UserId>, skip: i64, limit: i64) -> Self {
        Self {
            owner_id,
            status: None,
            skip,
            limit,
        }
    }
}

/// Orders have no free-form update; edits happen through status transitions.
#[derive(Debug, Clone, Default)]
pub struct OrderUpdateDBRequest {
    pub notes: Option<String>,
}

pub struct Orders<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Orders<'c> {
    type CreateRequest = OrderCreateDBRequest;
    type UpdateRequest = OrderUpdateDBRequest;
    type Response = OrderDBResponse;
    type Id = OrderId;
    type Filter = OrderFilter;

    #[instrument(skip(self, request), fields(owner_id = %abbrev_uuid(&request.owner_id), items = request.items.len()), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let subtotal: Decimal = request
            .items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum();
        let total = subtotal - request.discount;

        let mut tx = self.db.begin().await?;

        let order = sqlx::query_as::<_, OrderDBResponse>(
            r#"
            INSERT INTO orders (owner_id, customer_id, enquiry_id, subtotal, discount, total, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(request.owner_id)
        .bind(request.customer_id)
        .bind(request.enquiry_id)
        .bind(subtotal)
        .bind(request.discount)
        .bind(total)
        .bind(&request.notes)
        .fetch_one(&mut *tx)
        .await?;

        for (index, item) in request.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, line_no, quantity, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id)
            .bind(item.product_id)
            .bind(index as i32 + 1)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.unit_price * Decimal::from(item.quantity))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let order = sqlx::query_as::<_, OrderDBResponse>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(order)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let orders = sqlx::query_as::<_, OrderDBResponse>(
            r#"
            SELECT * FROM orders
            WHERE ($1::uuid IS NULL OR owner_id = $1)
              AND ($2::order_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.owner_id)
        .bind(filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(orders)
    }

    #[instrument(skip(self), fields(order_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(order_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let order = sqlx::query_as::<_, OrderDBResponse>(
            "UPDATE orders SET notes = COALESCE($2, notes), updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&request.notes)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(order)
    }
}

impl<'c> Orders<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Total rows matching the filter, ignoring pagination.
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &OrderFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE ($1::uuid IS NULL OR owner_id = $1)
              AND ($2::order_status IS NULL OR status = $2)
            "#,
        )
        .bind(filter.owner_id)
        .bind(filter.status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }

    /// Move an order to `new_status`, rejecting illegal transitions.
    #[instrument(skip(self), fields(order_id = %abbrev_uuid(&id), ?new_status), err)]
    pub async fn transition(&mut self, id: OrderId, new_status: OrderStatus) -> Result<OrderDBResponse> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, OrderDBResponse>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

        if !current.status.can_transition_to(new_status) {
            return Err(DbError::CheckViolation {
                constraint: Some("order_status_transition".to_string()),
                table: Some("orders".to_string()),
                message: format!("Cannot move order from {:?} to {:?}", current.status, new_status),
            });
        }

        let updated = sqlx::query_as::<_, OrderDBResponse>(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(new_status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Line items in the order they were submitted.
    #[instrument(skip(self), fields(order_id = %abbrev_uuid(&id)), err)]
    pub async fn list_items(&mut self, id: OrderId) -> Result<Vec<OrderItemDBResponse>> {
        let items = sqlx::query_as::<_, OrderItemDBResponse>(
            "SELECT * FROM order_items WHERE order_id = $1 ORDER BY line_no",
        )
        .bind(id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::customers::Customers;
    use crate::db::models::customers::CustomerCreateDBRequest;
    use crate::db::models::orders::OrderItemCreateDBRequest;
    use crate::test_utils::{create_test_product, create_test_reseller};
    use sqlx::PgPool;

    async fn setup_order(conn: &mut PgConnection) -> OrderDBResponse {
        let owner = create_test_reseller(conn, "orderowner").await;
        let product = create_test_product(conn, owner.id, "Gadget").await;
        let customer = Customers::new(conn)
            .create(&CustomerCreateDBRequest {
                owner_id: owner.id,
                name: "Order Customer".to_string(),
                email: None,
                phone: None,
                address: None,
                notes: None,
            })
            .await
            .unwrap();

        Orders::new(conn)
            .create(&OrderCreateDBRequest {
                owner_id: owner.id,
                customer_id: customer.id,
                enquiry_id: None,
                discount: Decimal::new(500, 2),
                notes: None,
                items: vec![
                    OrderItemCreateDBRequest {
                        product_id: product.id,
                        quantity: 2,
                        unit_price: Decimal::new(1000, 2),
                    },
                    OrderItemCreateDBRequest {
                        product_id: product.id,
                        quantity: 1,
                        unit_price: Decimal::new(2550, 2),
                    },
                ],
            })
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_computes_totals(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let order = setup_order(&mut conn).await;

        // 2 * 10.00 + 1 * 25.50 = 45.50, minus 5.00 discount
        assert_eq!(order.subtotal, Decimal::new(4550, 2));
        assert_eq!(order.total, Decimal::new(4050, 2));
        assert_eq!(order.status, OrderStatus::Pending);

        let items = Orders::new(&mut conn).list_items(order.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].line_total, Decimal::new(2000, 2));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_items_listed_in_submission_order(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_test_reseller(&mut conn, "lineowner").await;
        let product = create_test_product(&mut conn, owner.id, "Gadget").await;
        let customer = Customers::new(&mut conn)
            .create(&CustomerCreateDBRequest {
                owner_id: owner.id,
                name: "Line Customer".to_string(),
                email: None,
                phone: None,
                address: None,
                notes: None,
            })
            .await
            .unwrap();

        let items: Vec<_> = (1..=5)
            .map(|n| OrderItemCreateDBRequest {
                product_id: product.id,
                quantity: n,
                unit_price: Decimal::new(100 * i64::from(n), 2),
            })
            .collect();
        let order = Orders::new(&mut conn)
            .create(&OrderCreateDBRequest {
                owner_id: owner.id,
                customer_id: customer.id,
                enquiry_id: None,
                discount: Decimal::ZERO,
                notes: None,
                items,
            })
            .await
            .unwrap();

        let listed = Orders::new(&mut conn).list_items(order.id).await.unwrap();
        let quantities: Vec<i32> = listed.iter().map(|item| item.quantity).collect();
        assert_eq!(quantities, vec![1, 2, 3, 4, 5]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_transition_walks_forward(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let order = setup_order(&mut conn).await;
        let mut repo = Orders::new(&mut conn);

        let confirmed = repo.transition(order.id, OrderStatus::Confirmed).await.unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);
        let shipped = repo.transition(order.id, OrderStatus::Shipped).await.unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_illegal_transition_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let order = setup_order(&mut conn).await;
        let mut repo = Orders::new(&mut conn);

        let err = repo.transition(order.id, OrderStatus::Delivered).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));

        // Status must be unchanged after the rejected transition
        let unchanged = repo.get_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, OrderStatus::Pending);
    }
}
