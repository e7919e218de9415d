//! Enquiry endpoints: CRUD, status transitions, the follow-up audit trail,
//! and conversion into an order.
//!
//! Status changes go through the state machine in
//! [`crate::db::models::enquiries::EnquiryStatus`]; illegal moves come back
//! as 400. Conversion creates (or reuses) a customer, creates the order with
//! catalogue prices, and marks the enquiry `converted` in one transaction.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    api::handlers::orders,
    api::models::{
        enquiries::{
            EnquiryConvertRequest, EnquiryCreate, EnquiryFollowupResponse, EnquiryResponse, EnquiryStatusUpdate,
            EnquiryUpdate, ListEnquiriesQuery,
        },
        orders::OrderResponse,
        pagination::PaginatedResponse,
        users::CurrentUser,
    },
    auth::permissions::{ensure, owner_scope},
    db::{
        handlers::{Customers, Enquiries, Orders, Products, Repository, enquiries::EnquiryFilter},
        models::{
            customers::CustomerCreateDBRequest,
            enquiries::EnquiryStatus,
            orders::{OrderCreateDBRequest, OrderItemCreateDBRequest},
        },
    },
    errors::Error,
    types::{EnquiryId, Operation, Resource},
};

fn enquiry_not_found(id: EnquiryId) -> Error {
    Error::NotFound {
        resource: "enquiry".to_string(),
        id: id.to_string(),
    }
}

/// Create a new enquiry
#[utoipa::path(
    post,
    path = "/api/v1/enquiries",
    request_body = EnquiryCreate,
    tag = "enquiries",
    responses(
        (status = 201, description = "Enquiry created", body = EnquiryResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_enquiry(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<EnquiryCreate>,
) -> Result<(StatusCode, Json<EnquiryResponse>), Error> {
    ensure(&current_user, Resource::Enquiries, Operation::CreateOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let enquiry = Enquiries::new(&mut conn)
        .create(&request.into_db_request(current_user.id))
        .await?;

    Ok((StatusCode::CREATED, Json(enquiry.into())))
}

/// List enquiries
#[utoipa::path(
    get,
    path = "/api/v1/enquiries",
    params(ListEnquiriesQuery),
    tag = "enquiries",
    responses(
        (status = 200, description = "Enquiries for the current scope", body = PaginatedResponse<EnquiryResponse>),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_enquiries(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListEnquiriesQuery>,
) -> Result<Json<PaginatedResponse<EnquiryResponse>>, Error> {
    ensure(&current_user, Resource::Enquiries, Operation::ReadOwn)?;

    let (skip, limit) = query.pagination.params();
    let mut filter = EnquiryFilter::new(owner_scope(&current_user), skip, limit);
    filter.status = query.status;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Enquiries::new(&mut conn);
    let total_count = repo.count(&filter).await?;
    let enquiries = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        enquiries.into_iter().map(EnquiryResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Get an enquiry by id
#[utoipa::path(
    get,
    path = "/api/v1/enquiries/{id}",
    params(("id" = Uuid, Path, description = "Enquiry id")),
    tag = "enquiries",
    responses(
        (status = 200, description = "The enquiry", body = EnquiryResponse),
        (status = 404, description = "Enquiry not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_enquiry(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<EnquiryId>,
) -> Result<Json<EnquiryResponse>, Error> {
    ensure(&current_user, Resource::Enquiries, Operation::ReadOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let enquiry = Enquiries::new(&mut conn)
        .get_by_id(id)
        .await?
        .filter(|e| current_user.is_admin || e.owner_id == current_user.id)
        .ok_or_else(|| enquiry_not_found(id))?;

    Ok(Json(enquiry.into()))
}

/// Update an enquiry's details
#[utoipa::path(
    put,
    path = "/api/v1/enquiries/{id}",
    params(("id" = Uuid, Path, description = "Enquiry id")),
    request_body = EnquiryUpdate,
    tag = "enquiries",
    responses(
        (status = 200, description = "Updated enquiry", body = EnquiryResponse),
        (status = 404, description = "Enquiry not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_enquiry(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<EnquiryId>,
    Json(request): Json<EnquiryUpdate>,
) -> Result<Json<EnquiryResponse>, Error> {
    ensure(&current_user, Resource::Enquiries, Operation::UpdateOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Enquiries::new(&mut conn);

    repo.get_by_id(id)
        .await?
        .filter(|e| current_user.is_admin || e.owner_id == current_user.id)
        .ok_or_else(|| enquiry_not_found(id))?;

    let enquiry = repo.update(id, &request.into()).await?;

    Ok(Json(enquiry.into()))
}

/// Change an enquiry's status
#[utoipa::path(
    patch,
    path = "/api/v1/enquiries/{id}/status",
    params(("id" = Uuid, Path, description = "Enquiry id")),
    request_body = EnquiryStatusUpdate,
    tag = "enquiries",
    responses(
        (status = 200, description = "Enquiry after the transition", body = EnquiryResponse),
        (status = 400, description = "Illegal status transition"),
        (status = 404, description = "Enquiry not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_enquiry_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<EnquiryId>,
    Json(request): Json<EnquiryStatusUpdate>,
) -> Result<Json<EnquiryResponse>, Error> {
    ensure(&current_user, Resource::Enquiries, Operation::UpdateOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Enquiries::new(&mut conn);

    repo.get_by_id(id)
        .await?
        .filter(|e| current_user.is_admin || e.owner_id == current_user.id)
        .ok_or_else(|| enquiry_not_found(id))?;

    let enquiry = repo.transition(id, request.status, request.note.as_deref()).await?;

    Ok(Json(enquiry.into()))
}

/// List an enquiry's follow-up history
#[utoipa::path(
    get,
    path = "/api/v1/enquiries/{id}/followups",
    params(("id" = Uuid, Path, description = "Enquiry id")),
    tag = "enquiries",
    responses(
        (status = 200, description = "Audit trail, oldest first", body = Vec<EnquiryFollowupResponse>),
        (status = 404, description = "Enquiry not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_enquiry_followups(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<EnquiryId>,
) -> Result<Json<Vec<EnquiryFollowupResponse>>, Error> {
    ensure(&current_user, Resource::Enquiries, Operation::ReadOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Enquiries::new(&mut conn);

    repo.get_by_id(id)
        .await?
        .filter(|e| current_user.is_admin || e.owner_id == current_user.id)
        .ok_or_else(|| enquiry_not_found(id))?;

    let followups = repo.list_followups(id).await?;

    Ok(Json(followups.into_iter().map(EnquiryFollowupResponse::from).collect()))
}

/// Convert an enquiry into an order
#[utoipa::path(
    post,
    path = "/api/v1/enquiries/{id}/convert",
    params(("id" = Uuid, Path, description = "Enquiry id")),
    request_body = EnquiryConvertRequest,
    tag = "enquiries",
    responses(
        (status = 201, description = "Order created from the enquiry", body = OrderResponse),
        (status = 400, description = "Enquiry cannot be converted or items are invalid"),
        (status = 404, description = "Enquiry not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn convert_enquiry(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<EnquiryId>,
    Json(request): Json<EnquiryConvertRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), Error> {
    ensure(&current_user, Resource::Enquiries, Operation::UpdateOwn)?;
    ensure(&current_user, Resource::Orders, Operation::CreateOwn)?;

    if request.items.is_empty() {
        return Err(Error::BadRequest {
            message: "Conversion requires at least one line item".to_string(),
        });
    }
    if request.items.iter().any(|item| item.quantity <= 0) {
        return Err(Error::BadRequest {
            message: "Line item quantities must be positive".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let enquiry = Enquiries::new(&mut tx)
        .get_by_id(id)
        .await?
        .filter(|e| current_user.is_admin || e.owner_id == current_user.id)
        .ok_or_else(|| enquiry_not_found(id))?;

    // Reuse the given customer or create one from the enquiry's contact details
    let customer = match request.customer_id {
        Some(customer_id) => Customers::new(&mut tx)
            .get_by_id(customer_id)
            .await?
            .filter(|c| c.owner_id == enquiry.owner_id)
            .ok_or_else(|| Error::NotFound {
                resource: "customer".to_string(),
                id: customer_id.to_string(),
            })?,
        None => {
            Customers::new(&mut tx)
                .create(&CustomerCreateDBRequest {
                    owner_id: enquiry.owner_id,
                    name: enquiry.customer_name.clone(),
                    email: enquiry.email.clone(),
                    phone: enquiry.phone.clone(),
                    address: None,
                    notes: None,
                })
                .await?
        }
    };

    // Price every line from the catalogue, never from the client
    let mut items = Vec::with_capacity(request.items.len());
    for item in &request.items {
        let product = Products::new(&mut tx)
            .get_by_id(item.product_id)
            .await?
            .filter(|p| p.owner_id == enquiry.owner_id)
            .ok_or_else(|| Error::NotFound {
                resource: "product".to_string(),
                id: item.product_id.to_string(),
            })?;

        if !product.is_active {
            return Err(Error::BadRequest {
                message: format!("Product '{}' is not active", product.name),
            });
        }

        items.push(OrderItemCreateDBRequest {
            product_id: product.id,
            quantity: item.quantity,
            unit_price: product.price,
        });
    }

    orders::validate_discount(request.discount, &items)?;

    let order = Orders::new(&mut tx)
        .create(&OrderCreateDBRequest {
            owner_id: enquiry.owner_id,
            customer_id: customer.id,
            enquiry_id: Some(enquiry.id),
            discount: request.discount,
            notes: request.notes.clone(),
            items,
        })
        .await?;

    // The transition fails (rolling everything back) if the enquiry is terminal
    Enquiries::new(&mut tx)
        .transition(enquiry.id, EnquiryStatus::Converted, Some("Converted to order"))
        .await?;

    let order_items = Orders::new(&mut tx).list_items(order.id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let response = OrderResponse::from(order).with_items(order_items.into_iter().map(Into::into).collect());

    Ok((StatusCode::CREATED, Json(response)))
}
