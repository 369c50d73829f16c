// Points balance, redemption into wallet credit, admin adjustments

use std::sync::Arc;

use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    app_config::AppConfig,
    config::Permission,
    db::DieselPool,
    middleware::AuthenticatedUser,
    models::{
        pagination::{Page, PageRequest},
        points::{
            redemption_value, AdjustPointsRequest, PointSource, PointTransaction,
            PointTransactionQuery, PointsSummary, RedeemPointsRequest, RedemptionPolicy,
            RedemptionResult,
        },
        user::User,
        wallet::{LedgerEntry, WalletSource},
    },
    schema::point_transactions,
    services::ledger::{PointsLedger, WalletLedger},
    utils::service_error::ServiceError,
};

fn filtered_point_transactions(
    user_id: Uuid,
    query: &PointTransactionQuery,
) -> point_transactions::BoxedQuery<'static, Pg> {
    let mut q = point_transactions::table
        .filter(point_transactions::user_id.eq(user_id))
        .into_boxed();

    if let Some(source) = query.source {
        q = q.filter(point_transactions::source.eq(source.as_str()));
    }

    q
}

/// Largest part of `balance` that is a whole number of redemption blocks.
pub fn redeemable_points(balance: i64, block: i64) -> i64 {
    if block <= 0 || balance <= 0 {
        return 0;
    }
    balance / block * block
}

pub struct PointsService {
    diesel_pool: DieselPool,
    config: Arc<AppConfig>,
}

impl PointsService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
            config: state.config.clone(),
        }
    }

    pub async fn summary(&self, caller: &AuthenticatedUser) -> Result<PointsSummary, ServiceError> {
        let mut conn = self.diesel_pool.get().await?;
        let user = User::find_by_id(&mut conn, caller.user_id)
            .await
            .map_err(ServiceError::not_found("User"))?;

        let rules = &self.config.business;
        Ok(PointsSummary {
            balance: user.points_balance,
            redeemable_points: redeemable_points(user.points_balance, rules.redemption_block),
            redemption: RedemptionPolicy::from(rules),
        })
    }

    pub async fn list_transactions(
        &self,
        caller: &AuthenticatedUser,
        query: PointTransactionQuery,
    ) -> Result<Page<PointTransaction>, ServiceError> {
        let page = PageRequest::new(query.page, query.per_page);
        let mut conn = self.diesel_pool.get().await?;

        let total = filtered_point_transactions(caller.user_id, &query)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let items = filtered_point_transactions(caller.user_id, &query)
            .select(PointTransaction::as_select())
            .order((
                point_transactions::created_at.desc(),
                point_transactions::id.desc(),
            ))
            .limit(page.limit())
            .offset(page.offset())
            .load(&mut conn)
            .await?;

        Ok(Page::new(items, total, page))
    }

    /// Debit points and credit their wallet value in one transaction.
    #[instrument(skip(self, caller, request), fields(user_id = %caller.user_id))]
    pub async fn redeem(
        &self,
        caller: &AuthenticatedUser,
        request: RedeemPointsRequest,
    ) -> Result<RedemptionResult, ServiceError> {
        request.validate()?;
        let points = request.points;
        let credit = redemption_value(points, &self.config.business)
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        let user_id = caller.user_id;
        let mut conn = self.diesel_pool.get().await?;

        let result = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let debit = PointsLedger::apply(
                        conn,
                        user_id,
                        -points,
                        PointSource::Redemption,
                        Some(Uuid::new_v4().to_string()),
                        Some(format!("Redeemed {} points", points)),
                    )
                    .await?;

                    let movement = WalletLedger::apply(
                        conn,
                        user_id,
                        LedgerEntry::credit(
                            credit,
                            WalletSource::PointsRedemption,
                            debit.transaction.id.to_string(),
                        )
                        .with_description(format!("Redeemed {} points", points)),
                    )
                    .await?;

                    Ok(RedemptionResult {
                        points_redeemed: points,
                        points_balance: debit.balance,
                        wallet_credit: credit,
                        wallet_balance: movement.balance,
                    })
                }
                .scope_boxed()
            })
            .await?;

        info!("User {} redeemed {} points for {}", user_id, points, credit);
        Ok(result)
    }

    #[instrument(skip(self, caller, request), fields(admin_id = %caller.user_id))]
    pub async fn admin_adjust(
        &self,
        caller: &AuthenticatedUser,
        user_id: Uuid,
        request: AdjustPointsRequest,
    ) -> Result<PointTransaction, ServiceError> {
        caller.require(Permission::AdjustBalances)?;
        request.validate()?;

        if request.points == 0 {
            return Err(ServiceError::validation("Points adjustment must not be zero"));
        }

        let points = request.points;
        let reason = request.reason.trim().to_string();
        let mut conn = self.diesel_pool.get().await?;

        let movement = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    PointsLedger::apply(
                        conn,
                        user_id,
                        points,
                        PointSource::Adjustment,
                        Some(Uuid::new_v4().to_string()),
                        Some(reason),
                    )
                    .await
                }
                .scope_boxed()
            })
            .await?;

        info!("Admin {} adjusted points of {} by {:+}", caller.user_id, user_id, points);
        Ok(movement.transaction)
    }
}
