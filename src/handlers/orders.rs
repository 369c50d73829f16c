// Product orders and fulfilment

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::{
        order::{CreateOrderRequest, Order, OrderListQuery, OrderWithItems},
        pagination::Page,
    },
    services::OrderService,
    utils::service_error::ServiceError,
};

/// All lines must belong to one business. Stock is reserved when the order
/// is placed and returned if it is cancelled.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "Orders",
    operation_id = "createOrder",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderWithItems),
        (status = 400, description = "Empty order, mixed businesses or bad quantity"),
        (status = 422, description = "Insufficient stock")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderWithItems>), ServiceError> {
    let order = OrderService::new(&state).create_order(&user, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    tag = "Orders",
    operation_id = "listOrders",
    params(OrderListQuery),
    responses((status = 200, description = "Orders visible to the caller", body = OrderPage)),
    security(("bearerAuth" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Page<Order>>, ServiceError> {
    Ok(Json(OrderService::new(&state).list_orders(&user, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    operation_id = "getOrder",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its lines", body = OrderWithItems),
        (status = 404, description = "Not found or not visible")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderWithItems>, ServiceError> {
    Ok(Json(OrderService::new(&state).get_order(&user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/ship",
    tag = "Orders",
    operation_id = "shipOrder",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Shipped", body = Order),
        (status = 403, description = "Not the business owner"),
        (status = 409, description = "Order is not paid")
    ),
    security(("bearerAuth" = []))
)]
pub async fn ship_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ServiceError> {
    Ok(Json(OrderService::new(&state).ship(&user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/deliver",
    tag = "Orders",
    operation_id = "deliverOrder",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Delivered", body = Order),
        (status = 403, description = "Not the business owner"),
        (status = 409, description = "Order is not shipped")
    ),
    security(("bearerAuth" = []))
)]
pub async fn deliver_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ServiceError> {
    Ok(Json(OrderService::new(&state).deliver(&user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    tag = "Orders",
    operation_id = "cancelOrder",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Cancelled and restocked", body = Order),
        (status = 403, description = "Neither the customer nor the business owner"),
        (status = 409, description = "Only pending orders can be cancelled")
    ),
    security(("bearerAuth" = []))
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ServiceError> {
    Ok(Json(OrderService::new(&state).cancel(&user, id).await?))
}
