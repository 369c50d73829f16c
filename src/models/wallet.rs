// Wallets and the wallet ledger

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::schema::{wallet_transactions, wallets};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "credit",
            TransactionKind::Debit => "debit",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "credit" => Some(TransactionKind::Credit),
            "debit" => Some(TransactionKind::Debit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WalletSource {
    TopUp,
    Payment,
    Refund,
    PointsRedemption,
    RewardPayout,
    Adjustment,
}

impl WalletSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletSource::TopUp => "top_up",
            WalletSource::Payment => "payment",
            WalletSource::Refund => "refund",
            WalletSource::PointsRedemption => "points_redemption",
            WalletSource::RewardPayout => "reward_payout",
            WalletSource::Adjustment => "adjustment",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "top_up" => Some(WalletSource::TopUp),
            "payment" => Some(WalletSource::Payment),
            "refund" => Some(WalletSource::Refund),
            "points_redemption" => Some(WalletSource::PointsRedemption),
            "reward_payout" => Some(WalletSource::RewardPayout),
            "adjustment" => Some(WalletSource::Adjustment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema)]
#[diesel(table_name = wallets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Minor units, never negative
    pub balance: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = wallets)]
pub struct NewWallet {
    pub user_id: Uuid,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema)]
#[diesel(table_name = wallet_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub kind: String,
    /// Always positive; direction is in `kind`
    pub amount: i64,
    pub balance_after: i64,
    pub source: String,
    /// Idempotency key, unique per source
    pub reference: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = wallet_transactions)]
pub struct NewWalletTransaction {
    pub wallet_id: Uuid,
    pub kind: String,
    pub amount: i64,
    pub balance_after: i64,
    pub source: String,
    pub reference: Option<String>,
    pub description: Option<String>,
}

/// A single ledger movement requested by a service.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub kind: TransactionKind,
    pub amount: i64,
    pub source: WalletSource,
    pub reference: Option<String>,
    pub description: Option<String>,
}

impl LedgerEntry {
    pub fn credit(amount: i64, source: WalletSource, reference: impl Into<String>) -> Self {
        Self {
            kind: TransactionKind::Credit,
            amount,
            source,
            reference: Some(reference.into()),
            description: None,
        }
    }

    pub fn debit(amount: i64, source: WalletSource, reference: impl Into<String>) -> Self {
        Self {
            kind: TransactionKind::Debit,
            amount,
            source,
            reference: Some(reference.into()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Balance after applying this entry, or `None` when a debit would overdraw.
    pub fn apply_to(&self, balance: i64) -> Option<i64> {
        match self.kind {
            TransactionKind::Credit => balance.checked_add(self.amount),
            TransactionKind::Debit => balance.checked_sub(self.amount).filter(|b| *b >= 0),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({ "amount": 50000 }))]
pub struct TopUpRequest {
    /// Minor units
    #[validate(range(min = 100, max = 10_000_000, message = "Amount must be between 100 and 10000000"))]
    pub amount: i64,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({ "amount": -2500, "description": "Duplicate top-up correction" }))]
pub struct AdjustWalletRequest {
    /// Signed, minor units; positive credits, negative debits
    pub amount: i64,
    #[validate(length(min = 3, max = 500, message = "Description must be 3-500 characters"))]
    pub description: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WalletTransactionQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub kind: Option<TransactionKind>,
    pub source: Option<WalletSource>,
}

impl Wallet {
    pub async fn find_by_user(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        wallets::table
            .filter(wallets::user_id.eq(owner))
            .select(Wallet::as_select())
            .first(conn)
            .await
    }

    pub async fn lock_by_user(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        wallets::table
            .filter(wallets::user_id.eq(owner))
            .for_update()
            .select(Wallet::as_select())
            .first(conn)
            .await
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_wallet: NewWallet,
    ) -> Result<Self, diesel::result::Error> {
        diesel::insert_into(wallets::table)
            .values(&new_wallet)
            .returning(Wallet::as_returning())
            .get_result(conn)
            .await
    }
}

impl WalletTransaction {
    pub async fn find_by_reference(
        conn: &mut AsyncPgConnection,
        source: WalletSource,
        reference: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        wallet_transactions::table
            .filter(wallet_transactions::source.eq(source.as_str()))
            .filter(wallet_transactions::reference.eq(reference))
            .select(WalletTransaction::as_select())
            .first(conn)
            .await
            .optional()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_and_debit() {
        let credit = LedgerEntry::credit(500, WalletSource::TopUp, "p-1");
        assert_eq!(credit.apply_to(1000), Some(1500));

        let debit = LedgerEntry::debit(1000, WalletSource::Payment, "p-2");
        assert_eq!(debit.apply_to(1000), Some(0));
        assert_eq!(debit.apply_to(999), None);
    }

    #[test]
    fn test_credit_overflow_is_rejected() {
        let credit = LedgerEntry::credit(1, WalletSource::Adjustment, "adj");
        assert_eq!(credit.apply_to(i64::MAX), None);
    }

    #[test]
    fn test_source_strings() {
        for source in [
            WalletSource::TopUp,
            WalletSource::Payment,
            WalletSource::Refund,
            WalletSource::PointsRedemption,
            WalletSource::RewardPayout,
            WalletSource::Adjustment,
        ] {
            assert_eq!(WalletSource::from_string(source.as_str()), Some(source));
        }
    }

    #[test]
    fn test_top_up_bounds() {
        assert!(TopUpRequest { amount: 100 }.validate().is_ok());
        assert!(TopUpRequest { amount: 99 }.validate().is_err());
        assert!(TopUpRequest { amount: 10_000_001 }.validate().is_err());
    }
}
