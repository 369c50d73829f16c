// Invoice issuing and lookup

use chrono::Utc;
use diesel::dsl::sql;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    app::AppState,
    app_config::BusinessRules,
    config::Permission,
    db::DieselPool,
    middleware::AuthenticatedUser,
    models::{
        invoice::{
            format_invoice_number, split_vat, Invoice, InvoiceListQuery, InvoiceStatus, NewInvoice,
        },
        pagination::{Page, PageRequest},
        payment::Payment,
    },
    schema::invoices,
    utils::service_error::ServiceError,
};

/// Issue the invoice for a completed payment. Top-ups are skipped and a
/// payment that already has an invoice gets the existing one back.
pub async fn issue_for_payment(
    conn: &mut AsyncPgConnection,
    payment: &Payment,
    rules: &BusinessRules,
) -> Result<Option<Invoice>, ServiceError> {
    if !payment.purpose_enum().is_some_and(|p| p.is_invoiced()) {
        return Ok(None);
    }

    if let Some(existing) = Invoice::find_by_payment(conn, payment.id).await? {
        debug!("Payment {} already invoiced as {}", payment.id, existing.invoice_number);
        return Ok(Some(existing));
    }

    let sequence: i64 = diesel::select(sql::<BigInt>("nextval('invoice_number_seq')"))
        .get_result(conn)
        .await?;

    let issued_at = Utc::now();
    let split = split_vat(payment.amount, rules.vat_rate_bps);

    let invoice = diesel::insert_into(invoices::table)
        .values(NewInvoice {
            invoice_number: format_invoice_number(&rules.invoice_prefix, issued_at, sequence),
            payment_id: payment.id,
            user_id: payment.user_id,
            business_id: payment.business_id,
            net_amount: split.net,
            tax_rate_bps: rules.vat_rate_bps,
            tax_amount: split.tax,
            total: payment.amount,
            currency: payment.currency.clone(),
        })
        .returning(Invoice::as_returning())
        .get_result(conn)
        .await?;

    info!(
        "Issued invoice {} for payment {} ({} + {} VAT)",
        invoice.invoice_number, payment.id, invoice.net_amount, invoice.tax_amount
    );
    Ok(Some(invoice))
}

/// Cancel the invoice of a refunded payment, if there is one.
pub async fn cancel_for_payment(
    conn: &mut AsyncPgConnection,
    payment_id: Uuid,
) -> Result<Option<Invoice>, ServiceError> {
    let cancelled = diesel::update(
        invoices::table
            .filter(invoices::payment_id.eq(payment_id))
            .filter(invoices::status.eq(InvoiceStatus::Issued.as_str())),
    )
    .set((
        invoices::status.eq(InvoiceStatus::Cancelled.as_str()),
        invoices::cancelled_at.eq(Some(Utc::now())),
    ))
    .returning(Invoice::as_returning())
    .get_result(conn)
    .await
    .optional()?;

    if let Some(invoice) = &cancelled {
        info!("Cancelled invoice {}", invoice.invoice_number);
    }
    Ok(cancelled)
}

fn scoped_invoices(
    caller: &AuthenticatedUser,
    query: &InvoiceListQuery,
) -> invoices::BoxedQuery<'static, Pg> {
    let mut q = invoices::table.into_boxed();

    if !caller.has_permission(Permission::ViewAllRecords) {
        q = q.filter(invoices::user_id.eq(caller.user_id));
    }
    if let Some(status) = query.status {
        q = q.filter(invoices::status.eq(status.as_str()));
    }

    q
}

pub struct InvoiceService {
    diesel_pool: DieselPool,
}

impl InvoiceService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
        }
    }

    pub async fn list_invoices(
        &self,
        caller: &AuthenticatedUser,
        query: InvoiceListQuery,
    ) -> Result<Page<Invoice>, ServiceError> {
        let page = PageRequest::new(query.page, query.per_page);
        let mut conn = self.diesel_pool.get().await?;

        let total = scoped_invoices(caller, &query)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let items = scoped_invoices(caller, &query)
            .select(Invoice::as_select())
            .order((invoices::issued_at.desc(), invoices::id.desc()))
            .limit(page.limit())
            .offset(page.offset())
            .load(&mut conn)
            .await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn get_invoice(
        &self,
        caller: &AuthenticatedUser,
        invoice_id: Uuid,
    ) -> Result<Invoice, ServiceError> {
        let mut conn = self.diesel_pool.get().await?;
        let invoice = Invoice::find_by_id(&mut conn, invoice_id)
            .await
            .map_err(ServiceError::not_found("Invoice"))?;

        if !caller.can_view_customer_record(invoice.user_id) {
            return Err(ServiceError::ResourceNotFound("Invoice"));
        }
        Ok(invoice)
    }
}
