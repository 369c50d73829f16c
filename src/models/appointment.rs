// Appointments and their status lifecycle

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::schema::appointments;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "no_show" => Some(AppointmentStatus::NoShow),
            _ => None,
        }
    }

    /// pending → confirmed | cancelled; confirmed → completed | cancelled | no_show
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
        )
    }

    /// Statuses that hold a slot in the customer's calendar
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub const ACTIVE: [&'static str; 2] = ["pending", "confirmed"];
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema)]
#[diesel(table_name = appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Appointment {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub business_id: Uuid,
    pub treatment_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Copied from the treatment at booking time, minor units
    pub price: i64,
    pub status: String,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = appointments)]
pub struct NewAppointment {
    pub customer_id: Uuid,
    pub business_id: Uuid,
    pub treatment_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub price: i64,
    pub notes: Option<String>,
}

impl NewAppointment {
    pub fn ends_at_for(scheduled_at: DateTime<Utc>, duration_minutes: i32) -> DateTime<Utc> {
        scheduled_at + Duration::minutes(i64::from(duration_minutes))
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({
    "treatment_id": "4f1c2a7e-8b0d-4c1e-9f3a-2d5b6c7e8f90",
    "scheduled_at": "2025-06-01T10:00:00Z",
    "notes": "Hassas cilt"
}))]
pub struct CreateAppointmentRequest {
    pub treatment_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    #[validate(length(max = 1000, message = "Notes must be less than 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct CancelAppointmentRequest {
    #[validate(length(max = 500, message = "Reason must be less than 500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AppointmentListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<AppointmentStatus>,
    pub business_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    /// Inclusive lower bound on `scheduled_at`
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `scheduled_at`
    pub to: Option<DateTime<Utc>>,
}

impl Appointment {
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        appointment_id: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        appointments::table
            .find(appointment_id)
            .select(Appointment::as_select())
            .first(conn)
            .await
    }

    pub async fn lock_for_update(
        conn: &mut AsyncPgConnection,
        appointment_id: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        appointments::table
            .find(appointment_id)
            .for_update()
            .select(Appointment::as_select())
            .first(conn)
            .await
    }

    /// Whether the customer already holds an active appointment overlapping `[start, end)`.
    pub async fn customer_has_overlap(
        conn: &mut AsyncPgConnection,
        customer: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, diesel::result::Error> {
        use diesel::dsl::exists;

        diesel::select(exists(
            appointments::table
                .filter(appointments::customer_id.eq(customer))
                .filter(appointments::status.eq_any(AppointmentStatus::ACTIVE))
                .filter(appointments::scheduled_at.lt(end))
                .filter(appointments::ends_at.gt(start)),
        ))
        .get_result(conn)
        .await
    }

    pub fn status_enum(&self) -> Option<AppointmentStatus> {
        AppointmentStatus::from_string(&self.status)
    }
}
