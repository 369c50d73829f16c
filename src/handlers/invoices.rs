use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::AuthenticatedUser,
    models::{
        invoice::{Invoice, InvoiceListQuery},
        pagination::Page,
    },
    services::InvoiceService,
    utils::service_error::ServiceError,
};

#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    tag = "Invoices",
    operation_id = "listInvoices",
    params(InvoiceListQuery),
    responses((status = 200, description = "Invoices visible to the caller", body = InvoicePage)),
    security(("bearerAuth" = []))
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<InvoiceListQuery>,
) -> Result<Json<Page<Invoice>>, ServiceError> {
    Ok(Json(InvoiceService::new(&state).list_invoices(&user, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    tag = "Invoices",
    operation_id = "getInvoice",
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice", body = Invoice),
        (status = 404, description = "Not found or not visible")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Invoice>, ServiceError> {
    Ok(Json(InvoiceService::new(&state).get_invoice(&user, id).await?))
}
