use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::schema::payments;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub purpose: String,
    pub appointment_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub business_id: Option<Uuid>,
    pub method: String,
    pub provider: String,
    pub provider_payment_id: Option<String>,
    /// Minor units
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub purpose: String,
    pub appointment_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub business_id: Option<Uuid>,
    pub method: String,
    pub provider: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    /// A pending payment can still settle; everything else is final
    pub fn is_final(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Wallet,
    Card,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "wallet" => Some(PaymentMethod::Wallet),
            "card" => Some(PaymentMethod::Card),
            "cash" => Some(PaymentMethod::Cash),
            _ => None,
        }
    }

    pub fn provider(&self) -> PaymentProvider {
        match self {
            PaymentMethod::Wallet => PaymentProvider::Wallet,
            PaymentMethod::Card => PaymentProvider::Iyzico,
            PaymentMethod::Cash => PaymentProvider::Manual,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPurpose {
    Appointment,
    Order,
    WalletTopUp,
}

impl PaymentPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPurpose::Appointment => "appointment",
            PaymentPurpose::Order => "order",
            PaymentPurpose::WalletTopUp => "wallet_top_up",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "appointment" => Some(PaymentPurpose::Appointment),
            "order" => Some(PaymentPurpose::Order),
            "wallet_top_up" => Some(PaymentPurpose::WalletTopUp),
            _ => None,
        }
    }

    /// Top-ups move money into the customer's own wallet and are not sales
    pub fn is_invoiced(&self) -> bool {
        !matches!(self, PaymentPurpose::WalletTopUp)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentProvider {
    Wallet,
    Iyzico,
    Manual,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Wallet => "wallet",
            PaymentProvider::Iyzico => "iyzico",
            PaymentProvider::Manual => "manual",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({
    "purpose": "appointment",
    "appointment_id": "4f1c2a7e-8b0d-4c1e-9f3a-2d5b6c7e8f90",
    "method": "wallet"
}))]
pub struct CreatePaymentRequest {
    /// `appointment` or `order`; top-ups go through `/wallet/top-up`
    pub purpose: PaymentPurpose,
    pub appointment_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStatus {
    Success,
    Failure,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({
    "status": "success",
    "provider_payment_id": "iyz-20250601-000123"
}))]
pub struct PaymentCallbackRequest {
    pub status: CallbackStatus,
    #[validate(length(min = 1, max = 255, message = "Provider payment id must be 1-255 characters"))]
    pub provider_payment_id: String,
    #[validate(length(max = 500, message = "Failure reason must be less than 500 characters"))]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaymentListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
    pub purpose: Option<PaymentPurpose>,
}

impl Payment {
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        payment_id: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        payments::table
            .find(payment_id)
            .select(Payment::as_select())
            .first(conn)
            .await
    }

    pub async fn lock_for_update(
        conn: &mut AsyncPgConnection,
        payment_id: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        payments::table
            .find(payment_id)
            .for_update()
            .select(Payment::as_select())
            .first(conn)
            .await
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_payment: NewPayment,
    ) -> Result<Self, diesel::result::Error> {
        diesel::insert_into(payments::table)
            .values(&new_payment)
            .returning(Payment::as_returning())
            .get_result(conn)
            .await
    }

    /// Set a new status and the matching timestamp.
    pub async fn update_status(
        &mut self,
        conn: &mut AsyncPgConnection,
        new_status: PaymentStatus,
    ) -> Result<(), diesel::result::Error> {
        let now = Utc::now();
        self.status = new_status.as_str().to_string();
        self.updated_at = now;

        match new_status {
            PaymentStatus::Completed => self.completed_at = Some(now),
            PaymentStatus::Failed => self.failed_at = Some(now),
            PaymentStatus::Refunded => self.refunded_at = Some(now),
            PaymentStatus::Pending => {},
        }

        diesel::update(payments::table.find(self.id))
            .set((
                payments::status.eq(&self.status),
                payments::updated_at.eq(self.updated_at),
                payments::completed_at.eq(self.completed_at),
                payments::failed_at.eq(self.failed_at),
                payments::refunded_at.eq(self.refunded_at),
                payments::provider_payment_id.eq(&self.provider_payment_id),
                payments::failure_reason.eq(&self.failure_reason),
            ))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub fn status_enum(&self) -> Option<PaymentStatus> {
        PaymentStatus::from_string(&self.status)
    }

    pub fn method_enum(&self) -> Option<PaymentMethod> {
        PaymentMethod::from_string(&self.method)
    }

    pub fn purpose_enum(&self) -> Option<PaymentPurpose> {
        PaymentPurpose::from_string(&self.purpose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_statuses() {
        assert!(!PaymentStatus::Pending.is_final());
        assert!(PaymentStatus::Completed.is_final());
        assert!(PaymentStatus::Failed.is_final());
        assert!(PaymentStatus::Refunded.is_final());
    }

    #[test]
    fn test_method_provider() {
        assert_eq!(PaymentMethod::Card.provider().as_str(), "iyzico");
        assert_eq!(PaymentMethod::Wallet.provider().as_str(), "wallet");
        assert_eq!(PaymentMethod::Cash.provider().as_str(), "manual");
    }

    #[test]
    fn test_top_ups_are_not_invoiced() {
        assert!(PaymentPurpose::Appointment.is_invoiced());
        assert!(PaymentPurpose::Order.is_invoiced());
        assert!(!PaymentPurpose::WalletTopUp.is_invoiced());
    }

    #[test]
    fn test_purpose_wire_format() {
        let req: CreatePaymentRequest = serde_json::from_str(
            r#"{"purpose":"order","order_id":"4f1c2a7e-8b0d-4c1e-9f3a-2d5b6c7e8f90","method":"cash"}"#,
        )
        .unwrap();
        assert_eq!(req.purpose, PaymentPurpose::Order);
        assert_eq!(req.method, PaymentMethod::Cash);
        assert_eq!(PaymentPurpose::WalletTopUp.as_str(), "wallet_top_up");
    }
}
