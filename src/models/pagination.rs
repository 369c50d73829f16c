// Page-number pagination shared by every list endpoint

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{
    appointment::Appointment, business::Business, invoice::Invoice, order::Order,
    payment::Payment, points::PointTransaction, product::Product, reward::RewardSummary,
    treatment::Treatment, user::UserProfile, wallet::WalletTransaction,
};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Resolved `page` / `per_page` pair. Construction clamps out-of-range input
/// instead of rejecting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[aliases(
    UserPage = Page<UserProfile>,
    BusinessPage = Page<Business>,
    TreatmentPage = Page<Treatment>,
    AppointmentPage = Page<Appointment>,
    WalletTransactionPage = Page<WalletTransaction>,
    PointTransactionPage = Page<PointTransaction>,
    RewardSummaryPage = Page<RewardSummary>,
    PaymentPage = Page<Payment>,
    InvoicePage = Page<Invoice>,
    ProductPage = Page<Product>,
    OrderPage = Page<Order>
)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + request.per_page - 1) / request.per_page
        };

        Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            total_pages,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = PageRequest::new(None, None);
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 20);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, per_page: 1 });
        assert_eq!(PageRequest::new(Some(-5), Some(500)).per_page, 100);
        assert_eq!(PageRequest::new(Some(3), Some(25)).offset(), 50);
    }

    #[test]
    fn test_total_pages() {
        let req = PageRequest::new(Some(1), Some(20));
        assert_eq!(Page::<u8>::new(vec![], 0, req).total_pages, 0);
        assert_eq!(Page::<u8>::new(vec![], 20, req).total_pages, 1);
        assert_eq!(Page::<u8>::new(vec![], 21, req).total_pages, 2);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2, 3], 43, PageRequest::new(Some(2), Some(3)));
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20, 30]);
        assert_eq!(mapped.total, 43);
        assert_eq!(mapped.page, 2);
        assert_eq!(mapped.total_pages, 15);
    }
}
