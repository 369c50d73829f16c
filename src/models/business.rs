// Businesses (salons, spas, clinics) listed on the marketplace

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::schema::businesses;
use crate::utils::validation::PHONE_REGEX;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema)]
#[diesel(table_name = businesses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Business {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub city: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub completed_appointments: i32,
    /// Unpaid reward credit, minor units
    pub reward_balance: i64,
    pub rewarded_milestones: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = businesses)]
pub struct NewBusiness {
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub city: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = businesses)]
pub struct BusinessUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub city: Option<String>,
    pub address: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Lavanta Güzellik Salonu",
    "description": "Cilt bakımı ve masaj",
    "city": "İstanbul",
    "address": "Moda Cd. 12, Kadıköy",
    "phone": "+902161234567"
}))]
pub struct CreateBusinessRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be 2-200 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be less than 2000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 2, max = 100, message = "City must be 2-100 characters"))]
    pub city: String,

    #[validate(length(max = 500, message = "Address must be less than 500 characters"))]
    pub address: Option<String>,

    #[validate(regex(path = "PHONE_REGEX", message = "Invalid phone number"))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateBusinessRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be 2-200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "Description must be less than 2000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 2, max = 100, message = "City must be 2-100 characters"))]
    pub city: Option<String>,

    #[validate(length(max = 500, message = "Address must be less than 500 characters"))]
    pub address: Option<String>,

    #[validate(regex(path = "PHONE_REGEX", message = "Invalid phone number"))]
    pub phone: Option<String>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BusinessListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Matches name or description
    pub search: Option<String>,
    pub city: Option<String>,
}

impl Business {
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        business_id: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        businesses::table
            .find(business_id)
            .select(Business::as_select())
            .first(conn)
            .await
    }

    /// Row lock used by counters and reward balance changes
    pub async fn lock_for_update(
        conn: &mut AsyncPgConnection,
        business_id: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        businesses::table
            .find(business_id)
            .for_update()
            .select(Business::as_select())
            .first(conn)
            .await
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}
