//! Product catalogue endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        products::{ListProductsQuery, ProductCreate, ProductResponse, ProductUpdate},
        users::CurrentUser,
    },
    auth::permissions::{ensure, owner_scope},
    db::handlers::{Products, Repository, products::ProductFilter},
    errors::Error,
    types::{Operation, ProductId, Resource},
};

/// Create a new product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = ProductCreate,
    tag = "products",
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ProductCreate>,
) -> Result<(StatusCode, Json<ProductResponse>), Error> {
    ensure(&current_user, Resource::Products, Operation::CreateOwn)?;

    if request.price < rust_decimal::Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Product price cannot be negative".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let product = Products::new(&mut conn)
        .create(&request.into_db_request(current_user.id))
        .await?;

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// List products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ListProductsQuery),
    tag = "products",
    responses(
        (status = 200, description = "Products for the current scope", body = PaginatedResponse<ProductResponse>),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<PaginatedResponse<ProductResponse>>, Error> {
    ensure(&current_user, Resource::Products, Operation::ReadOwn)?;

    let (skip, limit) = query.pagination.params();
    let mut filter = ProductFilter::new(owner_scope(&current_user), skip, limit);
    filter.is_active = query.is_active;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Products::new(&mut conn);
    let total_count = repo.count(&filter).await?;
    let products = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        products.into_iter().map(ProductResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Get a product by id
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    tag = "products",
    responses(
        (status = 200, description = "The product", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductResponse>, Error> {
    ensure(&current_user, Resource::Products, Operation::ReadOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let product = Products::new(&mut conn)
        .get_by_id(id)
        .await?
        .filter(|p| current_user.is_admin || p.owner_id == current_user.id)
        .ok_or_else(|| Error::NotFound {
            resource: "product".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(product.into()))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = ProductUpdate,
    tag = "products",
    responses(
        (status = 200, description = "Updated product", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<ProductId>,
    Json(request): Json<ProductUpdate>,
) -> Result<Json<ProductResponse>, Error> {
    ensure(&current_user, Resource::Products, Operation::UpdateOwn)?;

    if request.price.is_some_and(|p| p < rust_decimal::Decimal::ZERO) {
        return Err(Error::BadRequest {
            message: "Product price cannot be negative".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Products::new(&mut conn);

    repo.get_by_id(id)
        .await?
        .filter(|p| current_user.is_admin || p.owner_id == current_user.id)
        .ok_or_else(|| Error::NotFound {
            resource: "product".to_string(),
            id: id.to_string(),
        })?;

    let product = repo.update(id, &request.into()).await?;

    Ok(Json(product.into()))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    tag = "products",
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, Error> {
    ensure(&current_user, Resource::Products, Operation::DeleteOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Products::new(&mut conn);

    repo.get_by_id(id)
        .await?
        .filter(|p| current_user.is_admin || p.owner_id == current_user.id)
        .ok_or_else(|| Error::NotFound {
            resource: "product".to_string(),
            id: id.to_string(),
        })?;

    repo.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
