// Treatments: the bookable service catalogue of a business

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::schema::treatments;
use crate::utils::validation::CATEGORY_REGEX;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema)]
#[diesel(table_name = treatments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Treatment {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    /// Minor units
    pub price: i64,
    pub duration_minutes: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = treatments)]
pub struct NewTreatment {
    pub business_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: i64,
    pub duration_minutes: i32,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = treatments)]
pub struct TreatmentUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<String>,
    pub price: Option<i64>,
    pub duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Klasik Cilt Bakımı",
    "category": "skin-care",
    "price": 85000,
    "duration_minutes": 60
}))]
pub struct CreateTreatmentRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be 2-200 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be less than 2000 characters"))]
    pub description: Option<String>,

    #[validate(regex(
        path = "CATEGORY_REGEX",
        message = "Category must be a lower-case slug such as 'skin-care'"
    ))]
    pub category: String,

    /// Minor units
    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: i64,

    #[validate(range(min = 5, max = 600, message = "Duration must be 5-600 minutes"))]
    pub duration_minutes: i32,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateTreatmentRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be 2-200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "Description must be less than 2000 characters"))]
    pub description: Option<String>,

    #[validate(regex(
        path = "CATEGORY_REGEX",
        message = "Category must be a lower-case slug such as 'skin-care'"
    ))]
    pub category: Option<String>,

    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: Option<i64>,

    #[validate(range(min = 5, max = 600, message = "Duration must be 5-600 minutes"))]
    pub duration_minutes: Option<i32>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TreatmentListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl Treatment {
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        treatment_id: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        treatments::table
            .find(treatment_id)
            .select(Treatment::as_select())
            .first(conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(price: i64, duration_minutes: i32, category: &str) -> CreateTreatmentRequest {
        CreateTreatmentRequest {
            name: "Manikür".to_string(),
            description: None,
            category: category.to_string(),
            price,
            duration_minutes,
        }
    }

    #[test]
    fn test_treatment_validation() {
        assert!(request(45000, 45, "nails").validate().is_ok());
        assert!(request(0, 45, "nails").validate().is_err());
        assert!(request(45000, 4, "nails").validate().is_err());
        assert!(request(45000, 601, "nails").validate().is_err());
        assert!(request(45000, 45, "Nails & Hands").validate().is_err());
    }
}
