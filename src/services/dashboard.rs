// Admin dashboard aggregates

use std::sync::Arc;

use diesel::dsl::{count_star, sql};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::{
    app::AppState,
    app_config::AppConfig,
    config::Permission,
    db::DieselPool,
    middleware::AuthenticatedUser,
    models::{
        dashboard::{with_zero_defaults, DashboardStats},
        payment::{PaymentPurpose, PaymentStatus},
    },
    schema::{appointments, businesses, orders, payments, users, wallets},
    utils::service_error::ServiceError,
};

const ROLES: [&str; 3] = ["customer", "business", "admin"];
const APPOINTMENT_STATUSES: [&str; 5] = ["pending", "confirmed", "completed", "cancelled", "no_show"];
const ORDER_STATUSES: [&str; 5] = ["pending", "paid", "shipped", "delivered", "cancelled"];

pub struct DashboardService {
    diesel_pool: DieselPool,
    config: Arc<AppConfig>,
}

impl DashboardService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
            config: state.config.clone(),
        }
    }

    pub async fn stats(&self, caller: &AuthenticatedUser) -> Result<DashboardStats, ServiceError> {
        caller.require(Permission::ViewDashboard)?;
        let mut conn = self.diesel_pool.get().await?;

        let users_by_role: Vec<(String, i64)> = users::table
            .group_by(users::role)
            .select((users::role, count_star()))
            .load(&mut conn)
            .await?;

        let appointments_by_status: Vec<(String, i64)> = appointments::table
            .group_by(appointments::status)
            .select((appointments::status, count_star()))
            .load(&mut conn)
            .await?;

        let orders_by_status: Vec<(String, i64)> = orders::table
            .group_by(orders::status)
            .select((orders::status, count_star()))
            .load(&mut conn)
            .await?;

        // SUM(bigint) is numeric in Postgres; cast back for i64
        let revenue: i64 = payments::table
            .filter(payments::status.eq(PaymentStatus::Completed.as_str()))
            .filter(payments::purpose.ne(PaymentPurpose::WalletTopUp.as_str()))
            .select(sql::<BigInt>("COALESCE(SUM(amount), 0)::BIGINT"))
            .get_result(&mut conn)
            .await?;

        let reward_liability: i64 = businesses::table
            .select(sql::<BigInt>("COALESCE(SUM(reward_balance), 0)::BIGINT"))
            .get_result(&mut conn)
            .await?;

        let wallet_float: i64 = wallets::table
            .select(sql::<BigInt>("COALESCE(SUM(balance), 0)::BIGINT"))
            .get_result(&mut conn)
            .await?;

        debug!("Dashboard computed: revenue {}, liability {}", revenue, reward_liability);

        Ok(DashboardStats {
            users_by_role: with_zero_defaults(users_by_role, &ROLES),
            appointments_by_status: with_zero_defaults(appointments_by_status, &APPOINTMENT_STATUSES),
            orders_by_status: with_zero_defaults(orders_by_status, &ORDER_STATUSES),
            revenue,
            reward_liability,
            wallet_float,
            currency: self.config.business.currency.clone(),
        })
    }
}
