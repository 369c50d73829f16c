// Wallet queries, top-ups and admin adjustments

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
        payment::{NewPayment, Payment, PaymentMethod, PaymentPurpose, PaymentStatus},
        wallet::{
            AdjustWalletRequest, LedgerEntry, TopUpRequest, Wallet, WalletSource,
            WalletTransaction, WalletTransactionQuery,
        },
    },
    schema::wallet_transactions,
    services::ledger::WalletLedger,
    utils::service_error::ServiceError,
};

fn filtered_transactions(
    wallet_id: Uuid,
    query: &WalletTransactionQuery,
) -> wallet_transactions::BoxedQuery<'static, Pg> {
    let mut q = wallet_transactions::table
        .filter(wallet_transactions::wallet_id.eq(wallet_id))
        .into_boxed();

    if let Some(kind) = query.kind {
        q = q.filter(wallet_transactions::kind.eq(kind.as_str()));
    }
    if let Some(source) = query.source {
        q = q.filter(wallet_transactions::source.eq(source.as_str()));
    }

    q
}

pub struct WalletService {
    diesel_pool: DieselPool,
    config: Arc<AppConfig>,
}

impl WalletService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
            config: state.config.clone(),
        }
    }

    pub async fn get_wallet(&self, caller: &AuthenticatedUser) -> Result<Wallet, ServiceError> {
        let mut conn = self.diesel_pool.get().await?;
        Wallet::find_by_user(&mut conn, caller.user_id)
            .await
            .map_err(ServiceError::not_found("Wallet"))
    }

    pub async fn list_transactions(
        &self,
        caller: &AuthenticatedUser,
        query: WalletTransactionQuery,
    ) -> Result<Page<WalletTransaction>, ServiceError> {
        let page = PageRequest::new(query.page, query.per_page);
        let mut conn = self.diesel_pool.get().await?;

        let wallet = Wallet::find_by_user(&mut conn, caller.user_id)
            .await
            .map_err(ServiceError::not_found("Wallet"))?;

        let total = filtered_transactions(wallet.id, &query)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let items = filtered_transactions(wallet.id, &query)
            .select(WalletTransaction::as_select())
            .order((
                wallet_transactions::created_at.desc(),
                wallet_transactions::id.desc(),
            ))
            .limit(page.limit())
            .offset(page.offset())
            .load(&mut conn)
            .await?;

        Ok(Page::new(items, total, page))
    }

    /// Open a pending card payment; the wallet is credited once it completes.
    #[instrument(skip(self, caller, request), fields(user_id = %caller.user_id))]
    pub async fn top_up(
        &self,
        caller: &AuthenticatedUser,
        request: TopUpRequest,
    ) -> Result<Payment, ServiceError> {
        request.validate()?;
        let mut conn = self.diesel_pool.get().await?;

        // The wallet must exist before money can be routed to it
        Wallet::find_by_user(&mut conn, caller.user_id)
            .await
            .map_err(ServiceError::not_found("Wallet"))?;

        let method = PaymentMethod::Card;
        let payment = Payment::create(
            &mut conn,
            NewPayment {
                user_id: caller.user_id,
                purpose: PaymentPurpose::WalletTopUp.as_str().to_string(),
                appointment_id: None,
                order_id: None,
                business_id: None,
                method: method.as_str().to_string(),
                provider: method.provider().as_str().to_string(),
                amount: request.amount,
                currency: self.config.business.currency.clone(),
                status: PaymentStatus::Pending.as_str().to_string(),
            },
        )
        .await?;

        info!("Opened top-up payment {} for {}", payment.id, payment.amount);
        Ok(payment)
    }

    #[instrument(skip(self, caller, request), fields(admin_id = %caller.user_id))]
    pub async fn admin_adjust(
        &self,
        caller: &AuthenticatedUser,
        user_id: Uuid,
        request: AdjustWalletRequest,
    ) -> Result<WalletTransaction, ServiceError> {
        caller.require(Permission::AdjustBalances)?;
        request.validate()?;

        if request.amount == 0 {
            return Err(ServiceError::validation("Adjustment amount must not be zero"));
        }

        let reference = Uuid::new_v4().to_string();
        let magnitude = request
            .amount
            .checked_abs()
            .ok_or_else(|| ServiceError::validation("Adjustment amount out of range"))?;
        let entry = if request.amount > 0 {
            LedgerEntry::credit(magnitude, WalletSource::Adjustment, reference)
        } else {
            LedgerEntry::debit(magnitude, WalletSource::Adjustment, reference)
        }
        .with_description(request.description.trim());

        let mut conn = self.diesel_pool.get().await?;
        let movement = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move { WalletLedger::apply(conn, user_id, entry).await }.scope_boxed()
            })
            .await?;

        info!(
            "Admin {} adjusted wallet of {} by {:+}",
            caller.user_id, user_id, request.amount
        );
        Ok(movement.transaction)
    }
}
