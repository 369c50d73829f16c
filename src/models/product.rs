// Retail products sold by businesses

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::schema::products;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Product {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub business_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: i32,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = products)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Argan Yağlı Şampuan 400ml",
    "price": 32000,
    "stock": 25
}))]
pub struct CreateProductRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be 2-200 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be less than 2000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: i64,

    #[validate(range(min = 0, max = 1_000_000, message = "Stock must be 0-1000000"))]
    pub stock: i32,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be 2-200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "Description must be less than 2000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: Option<i64>,

    #[validate(range(min = 0, max = 1_000_000, message = "Stock must be 0-1000000"))]
    pub stock: Option<i32>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    /// Hide sold-out products
    pub in_stock: Option<bool>,
}

impl Product {
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        product_id: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        products::table
            .find(product_id)
            .select(Product::as_select())
            .first(conn)
            .await
    }

    /// Lock a set of products, ordered by id so concurrent orders take locks in the same order.
    pub async fn lock_many(
        conn: &mut AsyncPgConnection,
        ids: &[Uuid],
    ) -> Result<Vec<Self>, diesel::result::Error> {
        products::table
            .filter(products::id.eq_any(ids))
            .order(products::id.asc())
            .for_update()
            .select(Product::as_select())
            .load(conn)
            .await
    }
}
