// Payments: wallet, card and cash settlement, provider callbacks, refunds

use std::sync::Arc;

use diesel::dsl::exists;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use subtle::ConstantTimeEq;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    app_config::{AppConfig, BusinessRules},
    config::Permission,
    db::DieselPool,
    middleware::AuthenticatedUser,
    models::{
        appointment::{Appointment, AppointmentStatus},
        business::Business,
        order::{Order, OrderStatus},
        pagination::{Page, PageRequest},
        payment::{
            CallbackStatus, CreatePaymentRequest, NewPayment, Payment, PaymentCallbackRequest,
            PaymentListQuery, PaymentMethod, PaymentPurpose, PaymentStatus,
        },
        wallet::{LedgerEntry, WalletSource},
    },
    schema::{orders, payments},
    services::{invoice, ledger::WalletLedger},
    utils::service_error::ServiceError,
};

/// Constant-time check of the callback signature header. An unset secret
/// rejects every callback.
pub fn signature_matches(provided: Option<&str>, secret: &str) -> bool {
    match provided {
        Some(provided) if !secret.is_empty() => {
            bool::from(provided.as_bytes().ct_eq(secret.as_bytes()))
        },
        _ => false,
    }
}

/// What a payment is paying for, resolved and locked.
struct PaymentTarget {
    customer_id: Uuid,
    business_id: Uuid,
    amount: i64,
}

fn invalid_payment_transition(payment: &Payment, to: PaymentStatus) -> ServiceError {
    ServiceError::InvalidStateTransition {
        entity: "payment",
        from: payment.status.clone(),
        to: to.as_str().to_string(),
    }
}

async fn lock_target(
    conn: &mut AsyncPgConnection,
    request: &CreatePaymentRequest,
) -> Result<PaymentTarget, ServiceError> {
    match request.purpose {
        PaymentPurpose::Appointment => {
            let id = request
                .appointment_id
                .ok_or_else(|| ServiceError::validation("appointment_id is required"))?;
            let appointment = Appointment::lock_for_update(conn, id)
                .await
                .map_err(ServiceError::not_found("Appointment"))?;

            match appointment.status_enum() {
                Some(AppointmentStatus::Cancelled) | Some(AppointmentStatus::NoShow) | None => {
                    return Err(ServiceError::Conflict(format!(
                        "Appointment is {} and cannot be paid",
                        appointment.status
                    )));
                },
                _ => {},
            }

            Ok(PaymentTarget {
                customer_id: appointment.customer_id,
                business_id: appointment.business_id,
                amount: appointment.price,
            })
        },
        PaymentPurpose::Order => {
            let id = request
                .order_id
                .ok_or_else(|| ServiceError::validation("order_id is required"))?;
            let order = Order::lock_for_update(conn, id)
                .await
                .map_err(ServiceError::not_found("Order"))?;

            if order.status_enum() != Some(OrderStatus::Pending) {
                return Err(ServiceError::Conflict(format!(
                    "Order is {} and cannot be paid",
                    order.status
                )));
            }

            Ok(PaymentTarget {
                customer_id: order.customer_id,
                business_id: order.business_id,
                amount: order.total,
            })
        },
        PaymentPurpose::WalletTopUp => Err(ServiceError::validation(
            "Wallet top-ups are started from /wallet/top-up",
        )),
    }
}

async fn has_open_payment(
    conn: &mut AsyncPgConnection,
    request: &CreatePaymentRequest,
) -> Result<bool, ServiceError> {
    let open = [PaymentStatus::Pending.as_str(), PaymentStatus::Completed.as_str()];

    let found = match request.purpose {
        PaymentPurpose::Appointment => {
            diesel::select(exists(
                payments::table
                    .filter(payments::status.eq_any(open))
                    .filter(payments::appointment_id.eq(request.appointment_id)),
            ))
            .get_result(conn)
            .await?
        },
        _ => {
            diesel::select(exists(
                payments::table
                    .filter(payments::status.eq_any(open))
                    .filter(payments::order_id.eq(request.order_id)),
            ))
            .get_result(conn)
            .await?
        },
    };

    Ok(found)
}

/// Side effects of a payment reaching `completed`: orders become paid,
/// top-ups credit the wallet, sales get an invoice.
async fn settle_completed(
    conn: &mut AsyncPgConnection,
    payment: &Payment,
    rules: &BusinessRules,
) -> Result<(), ServiceError> {
    match payment.purpose_enum() {
        Some(PaymentPurpose::Order) => {
            if let Some(order_id) = payment.order_id {
                let order = Order::lock_for_update(conn, order_id)
                    .await
                    .map_err(ServiceError::not_found("Order"))?;
                if order.status_enum() == Some(OrderStatus::Pending) {
                    diesel::update(orders::table.find(order_id))
                        .set((
                            orders::status.eq(OrderStatus::Paid.as_str()),
                            orders::updated_at.eq(chrono::Utc::now()),
                        ))
                        .execute(conn)
                        .await?;
                    info!("Order {} paid by payment {}", order_id, payment.id);
                }
            }
        },
        Some(PaymentPurpose::WalletTopUp) => {
            WalletLedger::apply(
                conn,
                payment.user_id,
                LedgerEntry::credit(payment.amount, WalletSource::TopUp, payment.id.to_string())
                    .with_description("Wallet top-up"),
            )
            .await?;
        },
        Some(PaymentPurpose::Appointment) | None => {},
    }

    invoice::issue_for_payment(conn, payment, rules).await?;
    Ok(())
}

fn scoped_payments(
    caller: &AuthenticatedUser,
    query: &PaymentListQuery,
) -> payments::BoxedQuery<'static, Pg> {
    let mut q = payments::table.into_boxed();

    if !caller.has_permission(Permission::ViewAllRecords) {
        q = q.filter(payments::user_id.eq(caller.user_id));
    }
    if let Some(status) = query.status {
        q = q.filter(payments::status.eq(status.as_str()));
    }
    if let Some(method) = query.method {
        q = q.filter(payments::method.eq(method.as_str()));
    }
    if let Some(purpose) = query.purpose {
        q = q.filter(payments::purpose.eq(purpose.as_str()));
    }

    q
}

pub struct PaymentService {
    diesel_pool: DieselPool,
    config: Arc<AppConfig>,
}

impl PaymentService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
            config: state.config.clone(),
        }
    }

    #[instrument(skip(self, caller, request), fields(user_id = %caller.user_id))]
    pub async fn create_payment(
        &self,
        caller: &AuthenticatedUser,
        request: CreatePaymentRequest,
    ) -> Result<Payment, ServiceError> {
        caller.require(Permission::Purchase)?;
        request.validate()?;

        let user_id = caller.user_id;
        let rules = self.config.business.clone();
        let mut conn = self.diesel_pool.get().await?;

        let payment = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let target = lock_target(conn, &request).await?;

                    if target.customer_id != user_id {
                        return Err(ServiceError::forbidden("Only the customer can pay for this"));
                    }
                    if has_open_payment(conn, &request).await? {
                        return Err(ServiceError::Conflict(
                            "A payment for this is already pending or completed".to_string(),
                        ));
                    }

                    let method = request.method;
                    let mut payment = Payment::create(
                        conn,
                        NewPayment {
                            user_id,
                            purpose: request.purpose.as_str().to_string(),
                            appointment_id: request.appointment_id.filter(|_| {
                                request.purpose == PaymentPurpose::Appointment
                            }),
                            order_id: request
                                .order_id
                                .filter(|_| request.purpose == PaymentPurpose::Order),
                            business_id: Some(target.business_id),
                            method: method.as_str().to_string(),
                            provider: method.provider().as_str().to_string(),
                            amount: target.amount,
                            currency: rules.currency.clone(),
                            status: PaymentStatus::Pending.as_str().to_string(),
                        },
                    )
                    .await?;

                    if method == PaymentMethod::Wallet {
                        WalletLedger::apply(
                            conn,
                            user_id,
                            LedgerEntry::debit(
                                payment.amount,
                                WalletSource::Payment,
                                payment.id.to_string(),
                            )
                            .with_description(format!("Payment for {}", payment.purpose)),
                        )
                        .await?;
                        payment.update_status(conn, PaymentStatus::Completed).await?;
                        settle_completed(conn, &payment, &rules).await?;
                    }

                    Ok(payment)
                }
                .scope_boxed()
            })
            .await?;

        info!(
            "Created {} payment {} ({}) for {}",
            payment.method, payment.id, payment.status, payment.amount
        );
        Ok(payment)
    }

    /// Provider notification for card payments. A payment already in a final
    /// state is returned unchanged.
    #[instrument(skip(self, signature, request))]
    pub async fn handle_callback(
        &self,
        payment_id: Uuid,
        signature: Option<&str>,
        request: PaymentCallbackRequest,
    ) -> Result<Payment, ServiceError> {
        if !signature_matches(signature, &self.config.security.payment_callback_secret) {
            warn!("Rejected payment callback with a bad signature for {}", payment_id);
            return Err(ServiceError::Unauthorized);
        }
        request.validate()?;

        let rules = self.config.business.clone();
        let mut conn = self.diesel_pool.get().await?;

        let payment = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let mut payment = Payment::lock_for_update(conn, payment_id)
                        .await
                        .map_err(ServiceError::not_found("Payment"))?;

                    if payment.status_enum().map_or(true, |s| s.is_final()) {
                        info!("Callback replay for final payment {}", payment.id);
                        return Ok(payment);
                    }
                    if payment.method_enum() != Some(PaymentMethod::Card) {
                        return Err(ServiceError::Conflict(
                            "Payment is not settled by the card provider".to_string(),
                        ));
                    }

                    payment.provider_payment_id = Some(request.provider_payment_id);
                    match request.status {
                        CallbackStatus::Success => {
                            payment.update_status(conn, PaymentStatus::Completed).await?;
                            settle_completed(conn, &payment, &rules).await?;
                        },
                        CallbackStatus::Failure => {
                            payment.failure_reason = request
                                .failure_reason
                                .or_else(|| Some("Declined by provider".to_string()));
                            payment.update_status(conn, PaymentStatus::Failed).await?;
                        },
                    }

                    Ok(payment)
                }
                .scope_boxed()
            })
            .await?;

        info!("Payment {} is {} after callback", payment.id, payment.status);
        Ok(payment)
    }

    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn confirm_cash(
        &self,
        caller: &AuthenticatedUser,
        payment_id: Uuid,
    ) -> Result<Payment, ServiceError> {
        let rules = self.config.business.clone();
        let confirmed_by = caller.user_id;
        let caller = caller.clone();
        let mut conn = self.diesel_pool.get().await?;

        let payment = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let mut payment = Payment::lock_for_update(conn, payment_id)
                        .await
                        .map_err(ServiceError::not_found("Payment"))?;

                    match payment.business_id {
                        Some(business_id) => {
                            let business = Business::find_by_id(conn, business_id)
                                .await
                                .map_err(ServiceError::not_found("Business"))?;
                            caller.require_business_manager(business.owner_id)?;
                        },
                        None => caller.require(Permission::ManageAnyBusiness)?,
                    }

                    if payment.method_enum() != Some(PaymentMethod::Cash) {
                        return Err(ServiceError::Conflict(
                            "Only cash payments can be confirmed by hand".to_string(),
                        ));
                    }
                    if payment.status_enum() != Some(PaymentStatus::Pending) {
                        return Err(invalid_payment_transition(&payment, PaymentStatus::Completed));
                    }

                    payment.update_status(conn, PaymentStatus::Completed).await?;
                    settle_completed(conn, &payment, &rules).await?;
                    Ok(payment)
                }
                .scope_boxed()
            })
            .await?;

        info!("Cash payment {} confirmed by {}", payment.id, confirmed_by);
        Ok(payment)
    }

    /// Refund a completed payment. Wallet and card payments for sales are
    /// credited back to the wallet; a refunded top-up takes the credited
    /// amount back out of it. Cash refunds happen at the counter.
    #[instrument(skip(self, caller), fields(admin_id = %caller.user_id))]
    pub async fn refund(
        &self,
        caller: &AuthenticatedUser,
        payment_id: Uuid,
    ) -> Result<Payment, ServiceError> {
        caller.require(Permission::RefundPayments)?;
        let mut conn = self.diesel_pool.get().await?;

        let payment = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let mut payment = Payment::lock_for_update(conn, payment_id)
                        .await
                        .map_err(ServiceError::not_found("Payment"))?;

                    if payment.status_enum() != Some(PaymentStatus::Completed) {
                        return Err(invalid_payment_transition(&payment, PaymentStatus::Refunded));
                    }

                    let reference = payment.id.to_string();
                    let entry = match (payment.method_enum(), payment.purpose_enum()) {
                        (Some(PaymentMethod::Cash), _) => None,
                        (_, Some(PaymentPurpose::WalletTopUp)) => Some(
                            LedgerEntry::debit(payment.amount, WalletSource::Refund, reference)
                                .with_description("Top-up refunded to card"),
                        ),
                        _ => Some(
                            LedgerEntry::credit(payment.amount, WalletSource::Refund, reference)
                                .with_description(format!("Refund of {} payment", payment.purpose)),
                        ),
                    };

                    if let Some(entry) = entry {
                        WalletLedger::apply(conn, payment.user_id, entry).await?;
                    }

                    invoice::cancel_for_payment(conn, payment.id).await?;
                    payment.update_status(conn, PaymentStatus::Refunded).await?;
                    Ok(payment)
                }
                .scope_boxed()
            })
            .await?;

        info!("Refunded payment {} ({})", payment.id, payment.amount);
        Ok(payment)
    }

    pub async fn list_payments(
        &self,
        caller: &AuthenticatedUser,
        query: PaymentListQuery,
    ) -> Result<Page<Payment>, ServiceError> {
        let page = PageRequest::new(query.page, query.per_page);
        let mut conn = self.diesel_pool.get().await?;

        let total = scoped_payments(caller, &query)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let items = scoped_payments(caller, &query)
            .select(Payment::as_select())
            .order((payments::created_at.desc(), payments::id.desc()))
            .limit(page.limit())
            .offset(page.offset())
            .load(&mut conn)
            .await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn get_payment(
        &self,
        caller: &AuthenticatedUser,
        payment_id: Uuid,
    ) -> Result<Payment, ServiceError> {
        let mut conn = self.diesel_pool.get().await?;
        let payment = Payment::find_by_id(&mut conn, payment_id)
            .await
            .map_err(ServiceError::not_found("Payment"))?;

        if !caller.can_view_customer_record(payment.user_id) {
            return Err(ServiceError::ResourceNotFound("Payment"));
        }
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "callback-secret-for-tests-0123456789";

    #[test]
    fn test_signature_matches_exact_secret() {
        assert!(signature_matches(Some(SECRET), SECRET));
    }

    #[test]
    fn test_signature_rejects_wrong_or_missing() {
        assert!(!signature_matches(Some("callback-secret-for-tests-012345678X"), SECRET));
        assert!(!signature_matches(Some("short"), SECRET));
        assert!(!signature_matches(None, SECRET));
    }

    #[test]
    fn test_empty_secret_rejects_everything() {
        assert!(!signature_matches(Some(""), ""));
        assert!(!signature_matches(Some("anything"), ""));
    }
}
