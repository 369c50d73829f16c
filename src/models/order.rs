// Product orders and their fulfilment lifecycle

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::schema::{order_items, orders};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Cancelled) | (Paid, Shipped) | (Shipped, Delivered)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub business_id: Uuid,
    pub status: String,
    pub total: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub business_id: Uuid,
    pub total: i64,
}

#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Associations, ToSchema,
)]
#[diesel(belongs_to(Order))]
#[diesel(table_name = order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    /// Name at the time of purchase
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItem {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 99, message = "Quantity must be 1-99"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[schema(example = json!({
    "items": [
        { "product_id": "9a0b1c2d-3e4f-4a5b-8c6d-7e8f9a0b1c2d", "quantity": 2 }
    ]
}))]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 50, message = "An order needs 1-50 items"))]
    #[validate]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<OrderStatus>,
    pub business_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
}

/// Sum of `unit_price * quantity`, or `None` on overflow.
pub fn order_total(lines: &[(i64, i32)]) -> Option<i64> {
    lines.iter().try_fold(0i64, |acc, (unit_price, quantity)| {
        unit_price
            .checked_mul(i64::from(*quantity))
            .and_then(|line| acc.checked_add(line))
    })
}

impl Order {
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        order_id: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        orders::table
            .find(order_id)
            .select(Order::as_select())
            .first(conn)
            .await
    }

    pub async fn lock_for_update(
        conn: &mut AsyncPgConnection,
        order_id: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        orders::table
            .find(order_id)
            .for_update()
            .select(Order::as_select())
            .first(conn)
            .await
    }

    pub async fn items(
        &self,
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<OrderItem>, diesel::result::Error> {
        OrderItem::belonging_to(self)
            .select(OrderItem::as_select())
            .load(conn)
            .await
    }

    pub fn status_enum(&self) -> Option<OrderStatus> {
        OrderStatus::from_string(&self.status)
    }
}
