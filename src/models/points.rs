// Loyalty points ledger and earn/redeem rules

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::app_config::BusinessRules;
use crate::schema::point_transactions;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PointSource {
    Appointment,
    Redemption,
    Adjustment,
}

impl PointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointSource::Appointment => "appointment",
            PointSource::Redemption => "redemption",
            PointSource::Adjustment => "adjustment",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "appointment" => Some(PointSource::Appointment),
            "redemption" => Some(PointSource::Redemption),
            "adjustment" => Some(PointSource::Adjustment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema)]
#[diesel(table_name = point_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PointTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Signed: earned points are positive, redeemed points negative
    pub amount: i64,
    pub balance_after: i64,
    pub source: String,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = point_transactions)]
pub struct NewPointTransaction {
    pub user_id: Uuid,
    pub amount: i64,
    pub balance_after: i64,
    pub source: String,
    pub reference: Option<String>,
    pub description: Option<String>,
}

/// Points earned for a completed appointment: one batch per whole currency
/// unit (100 minor units), fractions dropped.
pub fn points_for_price(price_minor: i64, points_per_unit: i64) -> i64 {
    if price_minor <= 0 {
        return 0;
    }
    (price_minor / 100).saturating_mul(points_per_unit)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RedemptionError {
    #[error("Points must be a positive multiple of {0}")]
    NotAMultiple(i64),
}

/// Wallet credit, in minor units, for redeeming `points`.
pub fn redemption_value(points: i64, rules: &BusinessRules) -> Result<i64, RedemptionError> {
    let block = rules.redemption_block;
    if block <= 0 || points <= 0 || points % block != 0 {
        return Err(RedemptionError::NotAMultiple(block));
    }
    Ok((points / block).saturating_mul(rules.redemption_block_value))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedemptionPolicy {
    /// Points must be redeemed in multiples of this
    pub block: i64,
    /// Wallet credit per block, minor units
    pub block_value: i64,
    pub currency: String,
}

impl From<&BusinessRules> for RedemptionPolicy {
    fn from(rules: &BusinessRules) -> Self {
        Self {
            block: rules.redemption_block,
            block_value: rules.redemption_block_value,
            currency: rules.currency.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PointsSummary {
    pub balance: i64,
    /// Largest amount currently redeemable
    pub redeemable_points: i64,
    pub redemption: RedemptionPolicy,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedemptionResult {
    pub points_redeemed: i64,
    pub points_balance: i64,
    pub wallet_credit: i64,
    pub wallet_balance: i64,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({ "points": 300 }))]
pub struct RedeemPointsRequest {
    #[validate(range(min = 1, message = "Points must be positive"))]
    pub points: i64,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({ "points": 150, "reason": "Goodwill after cancelled booking" }))]
pub struct AdjustPointsRequest {
    /// Signed; must not be zero
    pub points: i64,
    #[validate(length(min = 3, max = 500, message = "Reason must be 3-500 characters"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PointTransactionQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub source: Option<PointSource>,
}

impl PointTransaction {
    pub async fn find_by_reference(
        conn: &mut AsyncPgConnection,
        source: PointSource,
        reference: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        point_transactions::table
            .filter(point_transactions::source.eq(source.as_str()))
            .filter(point_transactions::reference.eq(reference))
            .select(PointTransaction::as_select())
            .first(conn)
            .await
            .optional()
    }
}
