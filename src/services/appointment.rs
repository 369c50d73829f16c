// Appointment booking and the status lifecycle

use std::sync::Arc;

use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    app_config::{AppConfig, BusinessRules},
    config::Permission,
    db::DieselPool,
    middleware::AuthenticatedUser,
    models::{
        appointment::{
            Appointment, AppointmentListQuery, AppointmentStatus, CancelAppointmentRequest,
            CreateAppointmentRequest, NewAppointment,
        },
        business::Business,
        pagination::{Page, PageRequest},
        points::{points_for_price, PointSource},
        reward::{pending_milestones, NewRewardTransaction, RewardKind},
        treatment::Treatment,
        user::{User, UserRole},
    },
    schema::{appointments, businesses, reward_transactions},
    services::ledger::PointsLedger,
    utils::{service_error::ServiceError, validation::trim_optional_field},
};

/// Appointments visible to the caller: own bookings for customers, own bookings
/// plus their businesses' bookings for business users, everything for admins.
fn scoped_appointments(
    caller: &AuthenticatedUser,
    query: &AppointmentListQuery,
) -> appointments::BoxedQuery<'static, Pg> {
    let mut q = appointments::table.into_boxed();

    if !caller.has_permission(Permission::ViewAllRecords) {
        if caller.role == UserRole::Business {
            let owned = businesses::table
                .filter(businesses::owner_id.eq(caller.user_id))
                .select(businesses::id);
            q = q.filter(
                appointments::customer_id
                    .eq(caller.user_id)
                    .or(appointments::business_id.eq_any(owned)),
            );
        } else {
            q = q.filter(appointments::customer_id.eq(caller.user_id));
        }
    }

    if let Some(status) = query.status {
        q = q.filter(appointments::status.eq(status.as_str()));
    }
    if let Some(business_id) = query.business_id {
        q = q.filter(appointments::business_id.eq(business_id));
    }
    if let Some(customer_id) = query.customer_id {
        q = q.filter(appointments::customer_id.eq(customer_id));
    }
    if let Some(from) = query.from {
        q = q.filter(appointments::scheduled_at.ge(from));
    }
    if let Some(to) = query.to {
        q = q.filter(appointments::scheduled_at.lt(to));
    }

    q
}

fn check_transition(
    appointment: &Appointment,
    next: AppointmentStatus,
) -> Result<(), ServiceError> {
    let current = appointment
        .status_enum()
        .ok_or_else(|| ServiceError::DatabaseError(format!("Unknown status {}", appointment.status)))?;

    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStateTransition {
            entity: "appointment",
            from: current.as_str().to_string(),
            to: next.as_str().to_string(),
        })
    }
}

/// Points, completion counter and milestone rewards for a completed
/// appointment. Runs inside the caller's transaction.
async fn apply_completion_effects(
    conn: &mut AsyncPgConnection,
    appointment: &Appointment,
    rules: &BusinessRules,
) -> Result<(), ServiceError> {
    let points = points_for_price(appointment.price, rules.points_per_unit);
    if points > 0 {
        PointsLedger::apply(
            conn,
            appointment.customer_id,
            points,
            PointSource::Appointment,
            Some(appointment.id.to_string()),
            Some("Completed appointment".to_string()),
        )
        .await?;
    }

    let business = Business::lock_for_update(conn, appointment.business_id)
        .await
        .map_err(ServiceError::not_found("Business"))?;

    let completed = business.completed_appointments.saturating_add(1);
    let milestones = pending_milestones(completed, business.rewarded_milestones, rules.reward_milestone);

    let mut reward_balance = business.reward_balance;
    let mut rewarded_milestones = business.rewarded_milestones;

    for milestone in milestones {
        diesel::insert_into(reward_transactions::table)
            .values(NewRewardTransaction {
                business_id: business.id,
                kind: RewardKind::Milestone.as_str().to_string(),
                amount: rules.reward_amount,
                milestone: Some(milestone),
            })
            .execute(conn)
            .await?;

        reward_balance = reward_balance.saturating_add(rules.reward_amount);
        rewarded_milestones = milestone;
        info!(
            "Business {} reached reward milestone {} ({} completed)",
            business.id, milestone, completed
        );
    }

    diesel::update(businesses::table.find(business.id))
        .set((
            businesses::completed_appointments.eq(completed),
            businesses::reward_balance.eq(reward_balance),
            businesses::rewarded_milestones.eq(rewarded_milestones),
            businesses::updated_at.eq(Utc::now()),
        ))
        .execute(conn)
        .await?;

    Ok(())
}

pub struct AppointmentService {
    diesel_pool: DieselPool,
    config: Arc<AppConfig>,
}

impl AppointmentService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
            config: state.config.clone(),
        }
    }

    #[instrument(skip(self, caller, request), fields(customer_id = %caller.user_id))]
    pub async fn create_appointment(
        &self,
        caller: &AuthenticatedUser,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, ServiceError> {
        caller.require(Permission::Purchase)?;
        request.validate()?;

        if request.scheduled_at <= Utc::now() {
            return Err(ServiceError::validation("Appointment must be scheduled in the future"));
        }

        let mut conn = self.diesel_pool.get().await?;

        let treatment = Treatment::find_by_id(&mut conn, request.treatment_id)
            .await
            .map_err(ServiceError::not_found("Treatment"))?;
        let business = Business::find_by_id(&mut conn, treatment.business_id)
            .await
            .map_err(ServiceError::not_found("Business"))?;

        if !treatment.is_active || !business.is_active {
            return Err(ServiceError::validation("Treatment is not available for booking"));
        }

        let customer_id = caller.user_id;
        let scheduled_at = request.scheduled_at;
        let ends_at = NewAppointment::ends_at_for(scheduled_at, treatment.duration_minutes);
        let notes = trim_optional_field(request.notes.as_ref());

        let appointment = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    // Serialise bookings per customer so the overlap check holds
                    User::lock_for_update(conn, customer_id)
                        .await
                        .map_err(ServiceError::not_found("User"))?;

                    if Appointment::customer_has_overlap(conn, customer_id, scheduled_at, ends_at)
                        .await?
                    {
                        return Err(ServiceError::Conflict(
                            "You already have an appointment in this time slot".to_string(),
                        ));
                    }

                    let appointment = diesel::insert_into(appointments::table)
                        .values(NewAppointment {
                            customer_id,
                            business_id: treatment.business_id,
                            treatment_id: treatment.id,
                            scheduled_at,
                            ends_at,
                            price: treatment.price,
                            notes,
                        })
                        .returning(Appointment::as_returning())
                        .get_result(conn)
                        .await?;

                    Ok(appointment)
                }
                .scope_boxed()
            })
            .await?;

        info!(
            "Booked appointment {} at business {} for {}",
            appointment.id, appointment.business_id, appointment.scheduled_at
        );
        Ok(appointment)
    }

    pub async fn list_appointments(
        &self,
        caller: &AuthenticatedUser,
        query: AppointmentListQuery,
    ) -> Result<Page<Appointment>, ServiceError> {
        let page = PageRequest::new(query.page, query.per_page);
        let mut conn = self.diesel_pool.get().await?;

        let total = scoped_appointments(caller, &query)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let items = scoped_appointments(caller, &query)
            .select(Appointment::as_select())
            .order((appointments::scheduled_at.desc(), appointments::id.asc()))
            .limit(page.limit())
            .offset(page.offset())
            .load(&mut conn)
            .await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn get_appointment(
        &self,
        caller: &AuthenticatedUser,
        appointment_id: Uuid,
    ) -> Result<Appointment, ServiceError> {
        let mut conn = self.diesel_pool.get().await?;
        let appointment = Appointment::find_by_id(&mut conn, appointment_id)
            .await
            .map_err(ServiceError::not_found("Appointment"))?;

        if caller.can_view_customer_record(appointment.customer_id) {
            return Ok(appointment);
        }

        let business = Business::find_by_id(&mut conn, appointment.business_id)
            .await
            .map_err(ServiceError::not_found("Business"))?;
        if business.is_owned_by(caller.user_id) {
            return Ok(appointment);
        }

        // Hide the existence of other people's bookings
        Err(ServiceError::ResourceNotFound("Appointment"))
    }

    pub async fn confirm(
        &self,
        caller: &AuthenticatedUser,
        appointment_id: Uuid,
    ) -> Result<Appointment, ServiceError> {
        self.business_transition(caller, appointment_id, AppointmentStatus::Confirmed)
            .await
    }

    pub async fn complete(
        &self,
        caller: &AuthenticatedUser,
        appointment_id: Uuid,
    ) -> Result<Appointment, ServiceError> {
        self.business_transition(caller, appointment_id, AppointmentStatus::Completed)
            .await
    }

    pub async fn mark_no_show(
        &self,
        caller: &AuthenticatedUser,
        appointment_id: Uuid,
    ) -> Result<Appointment, ServiceError> {
        self.business_transition(caller, appointment_id, AppointmentStatus::NoShow)
            .await
    }

    /// Transitions only the business side may make. Completion also applies
    /// the points and reward effects in the same transaction.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    async fn business_transition(
        &self,
        caller: &AuthenticatedUser,
        appointment_id: Uuid,
        next: AppointmentStatus,
    ) -> Result<Appointment, ServiceError> {
        let mut conn = self.diesel_pool.get().await?;
        let rules = self.config.business.clone();
        let caller = caller.clone();

        let appointment = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let appointment = Appointment::lock_for_update(conn, appointment_id)
                        .await
                        .map_err(ServiceError::not_found("Appointment"))?;

                    let business = Business::find_by_id(conn, appointment.business_id)
                        .await
                        .map_err(ServiceError::not_found("Business"))?;
                    caller.require_business_manager(business.owner_id)?;

                    check_transition(&appointment, next)?;

                    let now = Utc::now();
                    let completed_at = (next == AppointmentStatus::Completed).then_some(now);

                    let updated = diesel::update(appointments::table.find(appointment.id))
                        .set((
                            appointments::status.eq(next.as_str()),
                            appointments::completed_at.eq(completed_at),
                            appointments::updated_at.eq(now),
                        ))
                        .returning(Appointment::as_returning())
                        .get_result(conn)
                        .await?;

                    if next == AppointmentStatus::Completed {
                        apply_completion_effects(conn, &updated, &rules).await?;
                    }

                    Ok(updated)
                }
                .scope_boxed()
            })
            .await?;

        info!("Appointment {} is now {}", appointment.id, appointment.status);
        Ok(appointment)
    }

    #[instrument(skip(self, caller, request), fields(user_id = %caller.user_id))]
    pub async fn cancel(
        &self,
        caller: &AuthenticatedUser,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, ServiceError> {
        request.validate()?;
        let reason = trim_optional_field(request.reason.as_ref());
        let mut conn = self.diesel_pool.get().await?;
        let caller = caller.clone();

        let appointment = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let appointment = Appointment::lock_for_update(conn, appointment_id)
                        .await
                        .map_err(ServiceError::not_found("Appointment"))?;

                    if appointment.customer_id != caller.user_id {
                        let business = Business::find_by_id(conn, appointment.business_id)
                            .await
                            .map_err(ServiceError::not_found("Business"))?;
                        caller.require_business_manager(business.owner_id)?;
                    }

                    check_transition(&appointment, AppointmentStatus::Cancelled)?;

                    let now = Utc::now();
                    let updated = diesel::update(appointments::table.find(appointment.id))
                        .set((
                            appointments::status.eq(AppointmentStatus::Cancelled.as_str()),
                            appointments::cancellation_reason.eq(reason),
                            appointments::cancelled_at.eq(Some(now)),
                            appointments::updated_at.eq(now),
                        ))
                        .returning(Appointment::as_returning())
                        .get_result(conn)
                        .await?;

                    Ok(updated)
                }
                .scope_boxed()
            })
            .await?;

        info!("Appointment {} cancelled", appointment.id);
        Ok(appointment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn appointment(status: &str) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            treatment_id: Uuid::new_v4(),
            scheduled_at: now,
            ends_at: now + Duration::minutes(30),
            price: 45000,
            status: status.to_string(),
            notes: None,
            cancellation_reason: None,
            completed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_check_transition_allows_confirm() {
        assert!(check_transition(&appointment("pending"), AppointmentStatus::Confirmed).is_ok());
    }

    #[test]
    fn test_check_transition_rejects_completed_to_cancelled() {
        match check_transition(&appointment("completed"), AppointmentStatus::Cancelled) {
            Err(ServiceError::InvalidStateTransition { from, to, .. }) => {
                assert_eq!(from, "completed");
                assert_eq!(to, "cancelled");
            },
            other => panic!("expected InvalidStateTransition, got {:?}", other),
        }
    }

    #[test]
    fn test_check_transition_rejects_double_completion() {
        assert!(check_transition(&appointment("completed"), AppointmentStatus::Completed).is_err());
    }

    #[test]
    fn test_unknown_status_is_an_internal_error() {
        assert!(matches!(
            check_transition(&appointment("archived"), AppointmentStatus::Confirmed),
            Err(ServiceError::DatabaseError(_))
        ));
    }
}
