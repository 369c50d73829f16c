// Invoices issued for completed sales

use chrono::{DateTime, Datelike, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::schema::invoices;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Issued,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema)]
#[diesel(table_name = invoices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub business_id: Option<Uuid>,
    pub net_amount: i64,
    pub tax_rate_bps: i32,
    pub tax_amount: i64,
    /// VAT-inclusive, equals the payment amount
    pub total: i64,
    pub currency: String,
    pub status: String,
    /// Id at the e-invoice provider, once synced
    pub external_id: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = invoices)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub business_id: Option<Uuid>,
    pub net_amount: i64,
    pub tax_rate_bps: i32,
    pub tax_amount: i64,
    pub total: i64,
    pub currency: String,
}

/// Net and tax parts of a VAT-inclusive total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VatSplit {
    pub net: i64,
    pub tax: i64,
}

/// `net = round_half_up(total * 10000 / (10000 + rate_bps))`, `tax = total - net`.
pub fn split_vat(total: i64, rate_bps: i32) -> VatSplit {
    let rate = i128::from(rate_bps.max(0));
    let denominator = 10_000 + rate;
    let numerator = i128::from(total) * 10_000;
    let net = (numerator * 2 + denominator) / (denominator * 2);
    let net = net as i64;
    VatSplit {
        net,
        tax: total - net,
    }
}

pub fn format_invoice_number(prefix: &str, issued_at: DateTime<Utc>, sequence: i64) -> String {
    format!("{}-{}-{:06}", prefix, issued_at.year(), sequence)
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InvoiceListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<InvoiceStatus>,
}

impl Invoice {
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        invoice_id: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        invoices::table
            .find(invoice_id)
            .select(Invoice::as_select())
            .first(conn)
            .await
    }

    pub async fn find_by_payment(
        conn: &mut AsyncPgConnection,
        payment: Uuid,
    ) -> Result<Option<Self>, diesel::result::Error> {
        invoices::table
            .filter(invoices::payment_id.eq(payment))
            .select(Invoice::as_select())
            .first(conn)
            .await
            .optional()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_vat_standard_rate() {
        // 120.00 TRY at 20% VAT
        assert_eq!(split_vat(12_000, 2000), VatSplit { net: 10_000, tax: 2_000 });
    }

    #[test]
    fn test_split_vat_rounds_half_up() {
        // 100 / 1.2 = 83.333.. -> 83
        assert_eq!(split_vat(100, 2000), VatSplit { net: 83, tax: 17 });
        // 1 / 1.2 = 0.833.. -> 1
        assert_eq!(split_vat(1, 2000), VatSplit { net: 1, tax: 0 });
        // 3 * 10000 / 12000 = 2.5 -> 3
        assert_eq!(split_vat(3, 2000), VatSplit { net: 3, tax: 0 });
        // 10% rate: 55 / 1.1 = 50
        assert_eq!(split_vat(55, 1000), VatSplit { net: 50, tax: 5 });
    }

    #[test]
    fn test_split_vat_parts_sum_to_total() {
        for total in [1, 7, 99, 85_000, 123_457, 9_999_999] {
            for rate in [0, 100, 800, 1000, 2000] {
                let split = split_vat(total, rate);
                assert_eq!(split.net + split.tax, total);
                assert!(split.tax >= 0);
            }
        }
    }

    #[test]
    fn test_zero_rate_has_no_tax() {
        assert_eq!(split_vat(4_250, 0), VatSplit { net: 4_250, tax: 0 });
    }

    #[test]
    fn test_invoice_number_format() {
        let issued = "2025-03-14T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(format_invoice_number("INV", issued, 42), "INV-2025-000042");
        assert_eq!(
            format_invoice_number("GZL", issued, 1_234_567),
            "GZL-2025-1234567"
        );
    }
}
