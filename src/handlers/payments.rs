// Payments, the card provider callback and cash confirmation

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::{
        pagination::Page,
        payment::{CreatePaymentRequest, Payment, PaymentCallbackRequest, PaymentListQuery},
    },
    services::PaymentService,
    utils::service_error::ServiceError,
};

pub const PAYMENT_SIGNATURE_HEADER: &str = "x-payment-signature";

#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "Payments",
    operation_id = "createPayment",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment created; wallet payments settle immediately", body = Payment),
        (status = 400, description = "Target missing or mismatched"),
        (status = 402, description = "Wallet balance too low"),
        (status = 409, description = "Target already paid or not payable")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), ServiceError> {
    let payment = PaymentService::new(&state)
        .create_payment(&user, request)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments",
    tag = "Payments",
    operation_id = "listPayments",
    params(PaymentListQuery),
    responses((status = 200, description = "Payments visible to the caller", body = PaymentPage)),
    security(("bearerAuth" = []))
)]
pub async fn list_payments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<Page<Payment>>, ServiceError> {
    Ok(Json(PaymentService::new(&state).list_payments(&user, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    tag = "Payments",
    operation_id = "getPayment",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment", body = Payment),
        (status = 404, description = "Not found or not visible")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, ServiceError> {
    Ok(Json(PaymentService::new(&state).get_payment(&user, id).await?))
}

/// Provider notification for card payments. Authenticated by the shared
/// secret in `X-Payment-Signature`, not by a bearer token. Repeated
/// deliveries for a settled payment return it unchanged.
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/callback",
    tag = "Payments",
    operation_id = "paymentCallback",
    params(
        ("id" = Uuid, Path, description = "Payment id"),
        ("X-Payment-Signature" = String, Header, description = "Shared callback secret")
    ),
    request_body = PaymentCallbackRequest,
    responses(
        (status = 200, description = "Payment after applying the callback", body = Payment),
        (status = 401, description = "Signature missing or wrong"),
        (status = 409, description = "Not a card payment")
    )
)]
pub async fn payment_callback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<PaymentCallbackRequest>,
) -> Result<Json<Payment>, ServiceError> {
    let signature = headers
        .get(PAYMENT_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let payment = PaymentService::new(&state)
        .handle_callback(id, signature, request)
        .await?;
    Ok(Json(payment))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/confirm-cash",
    tag = "Payments",
    operation_id = "confirmCashPayment",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Cash payment completed", body = Payment),
        (status = 403, description = "Not the business owner"),
        (status = 409, description = "Not a pending cash payment")
    ),
    security(("bearerAuth" = []))
)]
pub async fn confirm_cash_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, ServiceError> {
    Ok(Json(PaymentService::new(&state).confirm_cash(&user, id).await?))
}
