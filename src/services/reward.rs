// Business reward balances and payouts

use std::sync::Arc;

use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    app::AppState,
    app_config::AppConfig,
    config::Permission,
    db::DieselPool,
    middleware::AuthenticatedUser,
    models::{
        business::Business,
        pagination::{Page, PageRequest},
        reward::{
            BusinessRewards, NewRewardTransaction, PayoutResult, RewardKind, RewardListQuery,
            RewardSummary, RewardTransaction,
        },
        wallet::{LedgerEntry, WalletSource},
    },
    schema::{businesses, reward_transactions},
    services::{business::managed_business, ledger::WalletLedger},
    utils::service_error::ServiceError,
};

fn filtered_reward_businesses(query: &RewardListQuery) -> businesses::BoxedQuery<'static, Pg> {
    let mut q = businesses::table.into_boxed();
    if query.with_balance == Some(true) {
        q = q.filter(businesses::reward_balance.gt(0));
    }
    q
}

pub struct RewardService {
    diesel_pool: DieselPool,
    config: Arc<AppConfig>,
}

impl RewardService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
            config: state.config.clone(),
        }
    }

    fn milestone_size(&self) -> i32 {
        self.config.business.reward_milestone
    }

    /// Reward standing of every business, largest unpaid balance first.
    pub async fn list_rewards(
        &self,
        caller: &AuthenticatedUser,
        query: RewardListQuery,
    ) -> Result<Page<RewardSummary>, ServiceError> {
        caller.require(Permission::PayoutRewards)?;
        let page = PageRequest::new(query.page, query.per_page);
        let mut conn = self.diesel_pool.get().await?;

        let total = filtered_reward_businesses(&query)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let rows: Vec<Business> = filtered_reward_businesses(&query)
            .select(Business::as_select())
            .order((businesses::reward_balance.desc(), businesses::name.asc()))
            .limit(page.limit())
            .offset(page.offset())
            .load(&mut conn)
            .await?;

        let size = self.milestone_size();
        let items = rows
            .iter()
            .map(|b| RewardSummary::from_business(b, size))
            .collect();

        Ok(Page::new(items, total, page))
    }

    pub async fn business_rewards(
        &self,
        caller: &AuthenticatedUser,
        business_id: Uuid,
    ) -> Result<BusinessRewards, ServiceError> {
        let mut conn = self.diesel_pool.get().await?;
        let business = managed_business(&mut conn, caller, business_id).await?;

        let transactions = reward_transactions::table
            .filter(reward_transactions::business_id.eq(business_id))
            .select(RewardTransaction::as_select())
            .order(reward_transactions::created_at.desc())
            .load(&mut conn)
            .await?;

        Ok(BusinessRewards {
            summary: RewardSummary::from_business(&business, self.milestone_size()),
            transactions,
        })
    }

    /// Move the whole reward balance into the owner's wallet.
    #[instrument(skip(self, caller), fields(admin_id = %caller.user_id))]
    pub async fn payout(
        &self,
        caller: &AuthenticatedUser,
        business_id: Uuid,
    ) -> Result<PayoutResult, ServiceError> {
        caller.require(Permission::PayoutRewards)?;
        let mut conn = self.diesel_pool.get().await?;

        let result = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let business = Business::lock_for_update(conn, business_id)
                        .await
                        .map_err(ServiceError::not_found("Business"))?;

                    let amount = business.reward_balance;
                    if amount <= 0 {
                        return Err(ServiceError::Conflict(
                            "Business has no reward balance to pay out".to_string(),
                        ));
                    }

                    let reward_tx = diesel::insert_into(reward_transactions::table)
                        .values(NewRewardTransaction {
                            business_id,
                            kind: RewardKind::Payout.as_str().to_string(),
                            amount: -amount,
                            milestone: None,
                        })
                        .returning(RewardTransaction::as_returning())
                        .get_result(conn)
                        .await?;

                    let movement = WalletLedger::apply(
                        conn,
                        business.owner_id,
                        LedgerEntry::credit(amount, WalletSource::RewardPayout, reward_tx.id.to_string())
                            .with_description(format!("Reward payout for {}", business.name)),
                    )
                    .await?;

                    diesel::update(businesses::table.find(business_id))
                        .set((
                            businesses::reward_balance.eq(0i64),
                            businesses::updated_at.eq(Utc::now()),
                        ))
                        .execute(conn)
                        .await?;

                    Ok(PayoutResult {
                        business_id,
                        owner_id: business.owner_id,
                        amount,
                        reward_transaction_id: reward_tx.id,
                        wallet_transaction_id: movement.transaction.id,
                        wallet_balance: movement.balance,
                    })
                }
                .scope_boxed()
            })
            .await?;

        info!(
            "Paid out {} reward to owner {} of business {}",
            result.amount, result.owner_id, result.business_id
        );
        Ok(result)
    }
}
