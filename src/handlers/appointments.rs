// Appointment booking and lifecycle transitions

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::{
        appointment::{
            Appointment, AppointmentListQuery, CancelAppointmentRequest, CreateAppointmentRequest,
        },
        pagination::Page,
    },
    services::AppointmentService,
    utils::service_error::ServiceError,
};

#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    tag = "Appointments",
    operation_id = "createAppointment",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = Appointment),
        (status = 400, description = "Validation failed or slot in the past"),
        (status = 404, description = "Treatment not found or inactive"),
        (status = 409, description = "Overlaps an existing booking")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), ServiceError> {
    let appointment = AppointmentService::new(&state)
        .create_appointment(&user, request)
        .await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// Customers see their own bookings, business owners also see bookings at
/// their businesses, admins see everything.
#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    tag = "Appointments",
    operation_id = "listAppointments",
    params(AppointmentListQuery),
    responses((status = 200, description = "Appointments visible to the caller", body = AppointmentPage)),
    security(("bearerAuth" = []))
)]
pub async fn list_appointments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Page<Appointment>>, ServiceError> {
    let page = AppointmentService::new(&state)
        .list_appointments(&user, query)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}",
    tag = "Appointments",
    operation_id = "getAppointment",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment", body = Appointment),
        (status = 404, description = "Not found or not visible")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, ServiceError> {
    Ok(Json(AppointmentService::new(&state).get_appointment(&user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/appointments/{id}/confirm",
    tag = "Appointments",
    operation_id = "confirmAppointment",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Confirmed", body = Appointment),
        (status = 403, description = "Not the business owner"),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearerAuth" = []))
)]
pub async fn confirm_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, ServiceError> {
    Ok(Json(AppointmentService::new(&state).confirm(&user, id).await?))
}

/// Completing awards loyalty points to the customer and advances the
/// business toward its next reward milestone.
#[utoipa::path(
    post,
    path = "/api/v1/appointments/{id}/complete",
    tag = "Appointments",
    operation_id = "completeAppointment",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Completed", body = Appointment),
        (status = 403, description = "Not the business owner"),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearerAuth" = []))
)]
pub async fn complete_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, ServiceError> {
    Ok(Json(AppointmentService::new(&state).complete(&user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/appointments/{id}/no-show",
    tag = "Appointments",
    operation_id = "markAppointmentNoShow",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Marked as no-show", body = Appointment),
        (status = 403, description = "Not the business owner"),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearerAuth" = []))
)]
pub async fn no_show_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, ServiceError> {
    Ok(Json(AppointmentService::new(&state).mark_no_show(&user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/appointments/{id}/cancel",
    tag = "Appointments",
    operation_id = "cancelAppointment",
    params(("id" = Uuid, Path, description = "Appointment id")),
    request_body(content = CancelAppointmentRequest, description = "Optional cancellation reason"),
    responses(
        (status = 200, description = "Cancelled", body = Appointment),
        (status = 403, description = "Neither the customer nor the business owner"),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearerAuth" = []))
)]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<Appointment>, ServiceError> {
    // The body is optional; an empty one means no reason given
    let request: CancelAppointmentRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CancelAppointmentRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ServiceError::validation(format!("Invalid request body: {}", e)))?
    };
    let appointment = AppointmentService::new(&state)
        .cancel(&user, id, request)
        .await?;
    Ok(Json(appointment))
}
