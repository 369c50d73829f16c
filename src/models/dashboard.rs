// Admin dashboard aggregates

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub users_by_role: BTreeMap<String, i64>,
    pub appointments_by_status: BTreeMap<String, i64>,
    pub orders_by_status: BTreeMap<String, i64>,
    /// Completed sales, excluding wallet top-ups, minor units
    pub revenue: i64,
    /// Sum of unpaid business reward balances
    pub reward_liability: i64,
    /// Sum of all wallet balances
    pub wallet_float: i64,
    pub currency: String,
}

/// Fill in zero counts for every known key so the panel gets stable columns.
pub fn with_zero_defaults(counts: Vec<(String, i64)>, keys: &[&str]) -> BTreeMap<String, i64> {
    let mut map: BTreeMap<String, i64> = keys.iter().map(|k| (k.to_string(), 0)).collect();
    for (key, count) in counts {
        *map.entry(key).or_insert(0) += count;
    }
    map
}
