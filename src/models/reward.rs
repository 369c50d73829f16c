// Business rewards: every N completed appointments credits a fixed amount

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::business::Business;
use crate::schema::reward_transactions;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Milestone,
    Payout,
}

impl RewardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardKind::Milestone => "milestone",
            RewardKind::Payout => "payout",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "milestone" => Some(RewardKind::Milestone),
            "payout" => Some(RewardKind::Payout),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema)]
#[diesel(table_name = reward_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RewardTransaction {
    pub id: Uuid,
    pub business_id: Uuid,
    pub kind: String,
    /// Positive for milestones, negative for payouts
    pub amount: i64,
    /// Milestone number (1 = first 50 completions); unset for payouts
    pub milestone: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reward_transactions)]
pub struct NewRewardTransaction {
    pub business_id: Uuid,
    pub kind: String,
    pub amount: i64,
    pub milestone: Option<i32>,
}

/// Milestones a business should hold for `completed` appointments but has not
/// yet been granted. Covers counters that moved without a grant.
pub fn pending_milestones(completed: i32, rewarded: i32, size: i32) -> Vec<i32> {
    if size <= 0 {
        return Vec::new();
    }
    let due = completed / size;
    ((rewarded.max(0) + 1)..=due).collect()
}

pub fn appointments_to_next_milestone(completed: i32, size: i32) -> i32 {
    if size <= 0 {
        return 0;
    }
    size - completed.rem_euclid(size)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewardSummary {
    pub business_id: Uuid,
    pub business_name: String,
    pub owner_id: Uuid,
    pub completed_appointments: i32,
    pub reward_balance: i64,
    pub rewarded_milestones: i32,
    pub appointments_to_next_milestone: i32,
}

impl RewardSummary {
    pub fn from_business(business: &Business, milestone_size: i32) -> Self {
        Self {
            business_id: business.id,
            business_name: business.name.clone(),
            owner_id: business.owner_id,
            completed_appointments: business.completed_appointments,
            reward_balance: business.reward_balance,
            rewarded_milestones: business.rewarded_milestones,
            appointments_to_next_milestone: appointments_to_next_milestone(
                business.completed_appointments,
                milestone_size,
            ),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BusinessRewards {
    pub summary: RewardSummary,
    pub transactions: Vec<RewardTransaction>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PayoutResult {
    pub business_id: Uuid,
    pub owner_id: Uuid,
    pub amount: i64,
    pub reward_transaction_id: Uuid,
    pub wallet_transaction_id: Uuid,
    pub wallet_balance: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RewardListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Only businesses with an unpaid balance
    pub with_balance: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_milestone() {
        assert_eq!(pending_milestones(50, 0, 50), vec![1]);
        assert_eq!(pending_milestones(100, 1, 50), vec![2]);
    }

    #[test]
    fn test_no_milestone_between_multiples() {
        assert!(pending_milestones(1, 0, 50).is_empty());
        assert!(pending_milestones(51, 1, 50).is_empty());
        assert!(pending_milestones(99, 1, 50).is_empty());
    }

    #[test]
    fn test_pending_milestones_catch_up() {
        assert_eq!(pending_milestones(150, 1, 50), vec![2, 3]);
        assert!(pending_milestones(149, 2, 50).is_empty());
        assert!(pending_milestones(10, 0, 0).is_empty());
    }

    #[test]
    fn test_appointments_to_next() {
        assert_eq!(appointments_to_next_milestone(0, 50), 50);
        assert_eq!(appointments_to_next_milestone(49, 50), 1);
        assert_eq!(appointments_to_next_milestone(50, 50), 50);
        assert_eq!(appointments_to_next_milestone(73, 50), 27);
    }
}
