//! Order endpoints: creation, status transitions, and invoices.
//!
//! Totals are computed server-side from catalogue prices. Confirming an order
//! reserves stock for every line inside the same transaction as the status
//! change, so an out-of-stock line rolls the whole confirmation back.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    AppState,
    api::models::{
        orders::{ListOrdersQuery, OrderCreate, OrderResponse, OrderStatusUpdate},
        pagination::PaginatedResponse,
        users::CurrentUser,
    },
    auth::permissions::{ensure, owner_scope},
    db::{
        errors::DbError,
        handlers::{Customers, Orders, Products, Repository, orders::OrderFilter},
        models::orders::{OrderCreateDBRequest, OrderItemCreateDBRequest, OrderStatus},
    },
    errors::Error,
    invoices,
    types::{Operation, OrderId, Resource},
};

fn order_not_found(id: OrderId) -> Error {
    Error::NotFound {
        resource: "order".to_string(),
        id: id.to_string(),
    }
}

/// A discount below zero would inflate the total; one above the subtotal
/// would store a negative total. Both are client errors.
pub(crate) fn validate_discount(discount: Decimal, items: &[OrderItemCreateDBRequest]) -> Result<(), Error> {
    if discount < Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Discount cannot be negative".to_string(),
        });
    }
    let subtotal: Decimal = items.iter().map(|item| item.unit_price * Decimal::from(item.quantity)).sum();
    if discount > subtotal {
        return Err(Error::BadRequest {
            message: "Discount cannot exceed the order subtotal".to_string(),
        });
    }
    Ok(())
}

/// Create a new order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = OrderCreate,
    tag = "orders",
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid line items or discount"),
        (status = 404, description = "Customer or product not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<OrderCreate>,
) -> Result<(StatusCode, Json<OrderResponse>), Error> {
    ensure(&current_user, Resource::Orders, Operation::CreateOwn)?;

    if request.items.is_empty() {
        return Err(Error::BadRequest {
            message: "An order requires at least one line item".to_string(),
        });
    }
    if request.items.iter().any(|item| item.quantity <= 0) {
        return Err(Error::BadRequest {
            message: "Line item quantities must be positive".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    Customers::new(&mut tx)
        .get_by_id(request.customer_id)
        .await?
        .filter(|c| current_user.is_admin || c.owner_id == current_user.id)
        .ok_or_else(|| Error::NotFound {
            resource: "customer".to_string(),
            id: request.customer_id.to_string(),
        })?;

    // Price every line from the catalogue, never from the client
    let mut items = Vec::with_capacity(request.items.len());
    for item in &request.items {
        let product = Products::new(&mut tx)
            .get_by_id(item.product_id)
            .await?
            .filter(|p| current_user.is_admin || p.owner_id == current_user.id)
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

    validate_discount(request.discount, &items)?;

    let order = Orders::new(&mut tx)
        .create(&OrderCreateDBRequest {
            owner_id: current_user.id,
            customer_id: request.customer_id,
            enquiry_id: None,
            discount: request.discount,
            notes: request.notes.clone(),
            items,
        })
        .await?;

    let order_items = Orders::new(&mut tx).list_items(order.id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let response = OrderResponse::from(order).with_items(order_items.into_iter().map(Into::into).collect());

    Ok((StatusCode::CREATED, Json(response)))
}

/// List orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(ListOrdersQuery),
    tag = "orders",
    responses(
        (status = 200, description = "Orders for the current scope", body = PaginatedResponse<OrderResponse>),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<PaginatedResponse<OrderResponse>>, Error> {
    ensure(&current_user, Resource::Orders, Operation::ReadOwn)?;

    let (skip, limit) = query.pagination.params();
    let mut filter = OrderFilter::new(owner_scope(&current_user), skip, limit);
    filter.status = query.status;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Orders::new(&mut conn);
    let total_count = repo.count(&filter).await?;
    let orders = repo.list(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        orders.into_iter().map(OrderResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Get an order with its line items
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    tag = "orders",
    responses(
        (status = 200, description = "The order", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>, Error> {
    ensure(&current_user, Resource::Orders, Operation::ReadOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Orders::new(&mut conn);

    let order = repo
        .get_by_id(id)
        .await?
        .filter(|o| current_user.is_admin || o.owner_id == current_user.id)
        .ok_or_else(|| order_not_found(id))?;

    let items = repo.list_items(id).await?;

    Ok(Json(
        OrderResponse::from(order).with_items(items.into_iter().map(Into::into).collect()),
    ))
}

/// Change an order's status
#[utoipa::path(
    patch,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = OrderStatusUpdate,
    tag = "orders",
    responses(
        (status = 200, description = "Order after the transition", body = OrderResponse),
        (status = 400, description = "Illegal status transition or insufficient stock"),
        (status = 404, description = "Order not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_order_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<OrderId>,
    Json(request): Json<OrderStatusUpdate>,
) -> Result<Json<OrderResponse>, Error> {
    ensure(&current_user, Resource::Orders, Operation::UpdateOwn)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    Orders::new(&mut tx)
        .get_by_id(id)
        .await?
        .filter(|o| current_user.is_admin || o.owner_id == current_user.id)
        .ok_or_else(|| order_not_found(id))?;

    // Confirmation reserves stock for every line; an out-of-stock line rolls
    // back the transition together with any earlier reservations.
    if request.status == OrderStatus::Confirmed {
        let items = Orders::new(&mut tx).list_items(id).await?;
        for item in &items {
            Products::new(&mut tx)
                .reserve_stock(item.product_id, item.quantity)
                .await
                .map_err(|e| match e {
                    DbError::NotFound => Error::BadRequest {
                        message: "Insufficient stock to confirm this order".to_string(),
                    },
                    other => Error::Database(other),
                })?;
        }
    }

    let order = Orders::new(&mut tx).transition(id, request.status).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(order.into()))
}

/// Delete a pending order
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    tag = "orders",
    responses(
        (status = 204, description = "Order deleted"),
        (status = 400, description = "Order is no longer pending"),
        (status = 404, description = "Order not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<OrderId>,
) -> Result<StatusCode, Error> {
    ensure(&current_user, Resource::Orders, Operation::DeleteOwn)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let order = Orders::new(&mut tx)
        .get_by_id(id)
        .await?
        .filter(|o| current_user.is_admin || o.owner_id == current_user.id)
        .ok_or_else(|| order_not_found(id))?;

    // Confirmed orders have reserved stock and appear on invoices; they are
    // cancelled via the status machine, not deleted.
    if order.status != OrderStatus::Pending {
        return Err(Error::BadRequest {
            message: "Only pending orders can be deleted".to_string(),
        });
    }

    Orders::new(&mut tx).delete(id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Render an order's invoice as HTML
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/invoice",
    params(("id" = Uuid, Path, description = "Order id")),
    tag = "orders",
    responses(
        (status = 200, description = "Invoice HTML", content_type = "text/html"),
        (status = 404, description = "Order not found"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_order_invoice(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<OrderId>,
) -> Result<Response, Error> {
    ensure(&current_user, Resource::Orders, Operation::ReadOwn)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Orders::new(&mut conn);

    let order = repo
        .get_by_id(id)
        .await?
        .filter(|o| current_user.is_admin || o.owner_id == current_user.id)
        .ok_or_else(|| order_not_found(id))?;

    let items = repo.list_items(id).await?;

    let customer = Customers::new(&mut conn)
        .get_by_id(order.customer_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "customer".to_string(),
            id: order.customer_id.to_string(),
        })?;

    let mut lines = Vec::with_capacity(items.len());
    for item in &items {
        // A product removed from the catalogue still appears on old invoices
        let description = Products::new(&mut conn)
            .get_by_id(item.product_id)
            .await?
            .map(|p| p.name)
            .unwrap_or_else(|| "Discontinued item".to_string());
        lines.push(invoices::InvoiceLine {
            description,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total,
        });
    }

    let html = invoices::render_order_invoice(&state.config, &order, &lines, &customer)?;

    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html).into_response())
}
