//! Database repository for products.

use crate::types::{ProductId, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::products::{MAX_PRODUCT_IMAGES, ProductCreateDBRequest, ProductDBResponse, ProductUpdateDBRequest},
};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing products
#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub owner_id: Option<UserId>,
    /// When set, only products matching this active flag are returned.
    pub is_active: Option<bool>,
    pub skip: i64,
    pub limit: i64,
}

impl ProductFilter {
    pub fn new(owner_id: Option<UserId>, skip: i64, limit: i64) -> Self {
        Self {
            owner_id,
            is_active: None,
            skip,
            limit,
        }
    }
}

pub struct Products<'c> {
    db: &'c mut PgConnection,
}

/// Keep at most [`MAX_PRODUCT_IMAGES`] URLs, dropping the tail.
fn truncate_images(urls: &[String]) -> Vec<String> {
    urls.iter().take(MAX_PRODUCT_IMAGES).cloned().collect()
}

#[async_trait::async_trait]
impl<'c> Repository for Products<'c> {
    type CreateRequest = ProductCreateDBRequest;
    type UpdateRequest = ProductUpdateDBRequest;
    type Response = ProductDBResponse;
    type Id = ProductId;
    type Filter = ProductFilter;

    #[instrument(skip(self, request), fields(owner_id = %abbrev_uuid(&request.owner_id), name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let product = sqlx::query_as::<_, ProductDBResponse>(
            r#"
            INSERT INTO products (owner_id, name, description, sku, price, stock, image_urls)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(request.owner_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.sku)
        .bind(request.price)
        .bind(request.stock)
        .bind(truncate_images(&request.image_urls))
        .fetch_one(&mut *self.db)
        .await?;

        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let product = sqlx::query_as::<_, ProductDBResponse>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(product)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let products = sqlx::query_as::<_, ProductDBResponse>(
            r#"
            SELECT * FROM products
            WHERE ($1::uuid IS NULL OR owner_id = $1)
              AND ($2::boolean IS NULL OR is_active = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.owner_id)
        .bind(filter.is_active)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(product_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let image_urls = request.image_urls.as_deref().map(truncate_images);

        let product = sqlx::query_as::<_, ProductDBResponse>(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                sku = COALESCE($4, sku),
                price = COALESCE($5, price),
                stock = COALESCE($6, stock),
                image_urls = COALESCE($7, image_urls),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.sku)
        .bind(request.price)
        .bind(request.stock)
        .bind(image_urls)
        .bind(request.is_active)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(product)
    }
}

impl<'c> Products<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Total rows matching the filter, ignoring pagination.
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &ProductFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM products
            WHERE ($1::uuid IS NULL OR owner_id = $1)
              AND ($2::boolean IS NULL OR is_active = $2)
            "#,
        )
        .bind(filter.owner_id)
        .bind(filter.is_active)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }

    /// Decrement stock for a confirmed order line, failing if not enough is available.
    #[instrument(skip(self), fields(product_id = %abbrev_uuid(&id), quantity), err)]
    pub async fn reserve_stock(&mut self, id: ProductId, quantity: i32) -> Result<ProductDBResponse> {
        let product = sqlx::query_as::<_, ProductDBResponse>(
            r#"
            UPDATE products SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(quantity)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_reseller;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    fn product_request(owner_id: UserId, name: &str, image_urls: Vec<String>) -> ProductCreateDBRequest {
        ProductCreateDBRequest {
            owner_id,
            name: name.to_string(),
            description: None,
            sku: None,
            price: Decimal::new(19999, 2),
            stock: 10,
            image_urls,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_image_urls_truncated_to_five(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_test_reseller(&mut conn, "imgowner").await;
        let mut repo = Products::new(&mut conn);

        let urls: Vec<String> = (0..8).map(|i| format!("https://img.example/{i}.jpg")).collect();
        let product = repo.create(&product_request(owner.id, "Widget", urls)).await.unwrap();

        assert_eq!(product.image_urls.len(), MAX_PRODUCT_IMAGES);
        assert_eq!(product.image_urls[0], "https://img.example/0.jpg");
        assert_eq!(product.image_urls[4], "https://img.example/4.jpg");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_image_urls_also_truncated(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_test_reseller(&mut conn, "imgowner2").await;
        let mut repo = Products::new(&mut conn);

        let product = repo.create(&product_request(owner.id, "Widget", vec![])).await.unwrap();

        let urls: Vec<String> = (0..6).map(|i| format!("https://img.example/u{i}.jpg")).collect();
        let updated = repo
            .update(
                product.id,
                &ProductUpdateDBRequest {
                    image_urls: Some(urls),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.image_urls.len(), MAX_PRODUCT_IMAGES);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_reserve_stock_insufficient(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_test_reseller(&mut conn, "stockowner").await;
        let mut repo = Products::new(&mut conn);

        let product = repo.create(&product_request(owner.id, "Scarce", vec![])).await.unwrap();

        let reserved = repo.reserve_stock(product.id, 7).await.unwrap();
        assert_eq!(reserved.stock, 3);

        let err = repo.reserve_stock(product.id, 4).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_active_filter(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_test_reseller(&mut conn, "activeowner").await;
        let mut repo = Products::new(&mut conn);

        let live = repo.create(&product_request(owner.id, "Live", vec![])).await.unwrap();
        let retired = repo.create(&product_request(owner.id, "Retired", vec![])).await.unwrap();
        repo.update(
            retired.id,
            &ProductUpdateDBRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut filter = ProductFilter::new(Some(owner.id), 0, 50);
        filter.is_active = Some(true);
        let active = repo.list(&filter).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, live.id);
    }
}
