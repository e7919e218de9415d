//! Customer management endpoints.
//!
//! Customers are per-reseller records. Resellers only ever see their own;
//! platform admins can list and inspect every tenant's customers. Cross-tenant
//! access returns 404 rather than 403 so ids cannot be probed.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        customers::{CustomerCreate, CustomerResponse, CustomerUpdate, ListCustomersQuery},
        pagination::PaginatedResponse,
        users::CurrentUser,
    },
    auth::permissions::{ensure, owner_scope},
    db::handlers::{Customers, Repository, customers::CustomerFilter},
    errors::Error,
    types::{CustomerId, Operation, Resource},
};

/// Create a new customer
#[utoipa::path(
    post,
    path = "/api/v1/customers",
    request_body = CustomerCreate,
    tag = "customers",
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<CustomerCreate>,
) -> Result<(StatusCode, Json<CustomerResponse>), Error> {
    ensure(&current_user, Resource::Customers, Operation::CreateOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let customer = Customers::new(&mut conn)
        .create(&request.into_db_request(current_user.id))
        .await?;

    Ok((StatusCode::CREATED, Json(customer.into())))
}

/// List customers
#[utoipa::path(
    get,
    path = "/api/v1/customers",
    params(ListCustomersQuery),
    tag = "customers",
    responses(
        (status = 200, description = "Customers for the current scope", body = PaginatedResponse<CustomerResponse>),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_customers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListCustomersQuery>,
) -> Result<Json<PaginatedResponse<CustomerResponse>>, Error> {
    ensure(&current_user, Resource::Customers, Operation::ReadOwn)?;

    let (skip, limit) = query.pagination.params();
    let filter = CustomerFilter::new(owner_scope(&current_user), skip, limit);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Customers::new(&mut conn);
    let total_count = repo.count(&filter).await?;
    let customers = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        customers.into_iter().map(CustomerResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Get a customer by id
#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    tag = "customers",
    responses(
        (status = 200, description = "The customer", body = CustomerResponse),
        (status = 404, description = "Customer not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<CustomerId>,
) -> Result<Json<CustomerResponse>, Error> {
    ensure(&current_user, Resource::Customers, Operation::ReadOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let customer = Customers::new(&mut conn)
        .get_by_id(id)
        .await?
        .filter(|c| current_user.is_admin || c.owner_id == current_user.id)
        .ok_or_else(|| Error::NotFound {
            resource: "customer".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(customer.into()))
}

/// Update a customer
#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = CustomerUpdate,
    tag = "customers",
    responses(
        (status = 200, description = "Updated customer", body = CustomerResponse),
        (status = 404, description = "Customer not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<CustomerId>,
    Json(request): Json<CustomerUpdate>,
) -> Result<Json<CustomerResponse>, Error> {
    ensure(&current_user, Resource::Customers, Operation::UpdateOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Customers::new(&mut conn);

    // Owner check before touching the row
    repo.get_by_id(id)
        .await?
        .filter(|c| current_user.is_admin || c.owner_id == current_user.id)
        .ok_or_else(|| Error::NotFound {
            resource: "customer".to_string(),
            id: id.to_string(),
        })?;

    let customer = repo.update(id, &request.into()).await?;

    Ok(Json(customer.into()))
}

/// Delete a customer
#[utoipa::path(
    delete,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    tag = "customers",
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 404, description = "Customer not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<CustomerId>,
) -> Result<StatusCode, Error> {
    ensure(&current_user, Resource::Customers, Operation::DeleteOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Customers::new(&mut conn);

    repo.get_by_id(id)
        .await?
        .filter(|c| current_user.is_admin || c.owner_id == current_user.id)
        .ok_or_else(|| Error::NotFound {
            resource: "customer".to_string(),
            id: id.to_string(),
        })?;

    repo.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
