// Product orders: stock reservation, fulfilment and cancellation

use std::collections::HashMap;

use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    config::Permission,
    db::DieselPool,
    middleware::AuthenticatedUser,
    models::{
        business::Business,
        order::{
            order_total, CreateOrderRequest, NewOrder, NewOrderItem, Order, OrderItem,
            OrderItemRequest, OrderListQuery, OrderStatus, OrderWithItems,
        },
        pagination::{Page, PageRequest},
        product::Product,
        user::UserRole,
    },
    schema::{businesses, order_items, orders, products},
    utils::service_error::ServiceError,
};

const MAX_LINE_QUANTITY: i32 = 99;

/// Merge repeated lines for the same product, keeping first-seen order.
pub fn merge_order_lines(items: &[OrderItemRequest]) -> Result<Vec<(Uuid, i32)>, ServiceError> {
    let mut merged: Vec<(Uuid, i32)> = Vec::with_capacity(items.len());
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for item in items {
        match index.get(&item.product_id) {
            Some(&i) => {
                let quantity = merged[i].1.saturating_add(item.quantity);
                if quantity > MAX_LINE_QUANTITY {
                    return Err(ServiceError::validation(format!(
                        "At most {} of one product per order",
                        MAX_LINE_QUANTITY
                    )));
                }
                merged[i].1 = quantity;
            },
            None => {
                index.insert(item.product_id, merged.len());
                merged.push((item.product_id, item.quantity));
            },
        }
    }

    Ok(merged)
}

fn scoped_orders(
    caller: &AuthenticatedUser,
    query: &OrderListQuery,
) -> orders::BoxedQuery<'static, Pg> {
    let mut q = orders::table.into_boxed();

    if !caller.has_permission(Permission::ViewAllRecords) {
        if caller.role == UserRole::Business {
            let owned = businesses::table
                .filter(businesses::owner_id.eq(caller.user_id))
                .select(businesses::id);
            q = q.filter(
                orders::customer_id
                    .eq(caller.user_id)
                    .or(orders::business_id.eq_any(owned)),
            );
        } else {
            q = q.filter(orders::customer_id.eq(caller.user_id));
        }
    }

    if let Some(status) = query.status {
        q = q.filter(orders::status.eq(status.as_str()));
    }
    if let Some(business_id) = query.business_id {
        q = q.filter(orders::business_id.eq(business_id));
    }
    if let Some(customer_id) = query.customer_id {
        q = q.filter(orders::customer_id.eq(customer_id));
    }

    q
}

fn check_transition(order: &Order, next: OrderStatus) -> Result<(), ServiceError> {
    match order.status_enum() {
        Some(current) if current.can_transition_to(next) => Ok(()),
        _ => Err(ServiceError::InvalidStateTransition {
            entity: "order",
            from: order.status.clone(),
            to: next.as_str().to_string(),
        }),
    }
}

async fn set_status(
    conn: &mut AsyncPgConnection,
    order_id: Uuid,
    status: OrderStatus,
) -> Result<Order, ServiceError> {
    Ok(diesel::update(orders::table.find(order_id))
        .set((
            orders::status.eq(status.as_str()),
            orders::updated_at.eq(Utc::now()),
        ))
        .returning(Order::as_returning())
        .get_result(conn)
        .await?)
}

pub struct OrderService {
    diesel_pool: DieselPool,
}

impl OrderService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
        }
    }

    /// Reserve stock and create the order in one transaction.
    #[instrument(skip(self, caller, request), fields(customer_id = %caller.user_id))]
    pub async fn create_order(
        &self,
        caller: &AuthenticatedUser,
        request: CreateOrderRequest,
    ) -> Result<OrderWithItems, ServiceError> {
        caller.require(Permission::Purchase)?;
        request.validate()?;

        let lines = merge_order_lines(&request.items)?;
        let customer_id = caller.user_id;
        let mut conn = self.diesel_pool.get().await?;

        let result = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let ids: Vec<Uuid> = lines.iter().map(|(id, _)| *id).collect();
                    let locked = Product::lock_many(conn, &ids).await?;
                    let by_id: HashMap<Uuid, Product> =
                        locked.into_iter().map(|p| (p.id, p)).collect();

                    let mut business_id = None;
                    let mut priced = Vec::with_capacity(lines.len());

                    for (product_id, quantity) in &lines {
                        let product = by_id
                            .get(product_id)
                            .ok_or(ServiceError::ResourceNotFound("Product"))?;

                        if !product.is_active {
                            return Err(ServiceError::validation(format!(
                                "{} is not available",
                                product.name
                            )));
                        }
                        match business_id {
                            None => business_id = Some(product.business_id),
                            Some(id) if id != product.business_id => {
                                return Err(ServiceError::validation(
                                    "All items must come from the same business",
                                ));
                            },
                            Some(_) => {},
                        }
                        if product.stock < *quantity {
                            return Err(ServiceError::InsufficientStock {
                                product: product.name.clone(),
                                available: product.stock,
                                requested: *quantity,
                            });
                        }

                        priced.push((product, *quantity));
                    }

                    let business_id =
                        business_id.ok_or_else(|| ServiceError::validation("Order has no items"))?;
                    let business = Business::find_by_id(conn, business_id)
                        .await
                        .map_err(ServiceError::not_found("Business"))?;
                    if !business.is_active {
                        return Err(ServiceError::validation("Business is not accepting orders"));
                    }

                    let amounts: Vec<(i64, i32)> =
                        priced.iter().map(|(p, q)| (p.price, *q)).collect();
                    let total = order_total(&amounts)
                        .ok_or_else(|| ServiceError::validation("Order total out of range"))?;

                    let order = diesel::insert_into(orders::table)
                        .values(NewOrder {
                            customer_id,
                            business_id,
                            total,
                        })
                        .returning(Order::as_returning())
                        .get_result(conn)
                        .await?;

                    let new_items: Vec<NewOrderItem> = priced
                        .iter()
                        .map(|(product, quantity)| NewOrderItem {
                            order_id: order.id,
                            product_id: product.id,
                            product_name: product.name.clone(),
                            quantity: *quantity,
                            unit_price: product.price,
                            line_total: product.price * i64::from(*quantity),
                        })
                        .collect();

                    let items = diesel::insert_into(order_items::table)
                        .values(&new_items)
                        .returning(OrderItem::as_returning())
                        .get_results(conn)
                        .await?;

                    for (product, quantity) in &priced {
                        diesel::update(products::table.find(product.id))
                            .set((
                                products::stock.eq(products::stock - *quantity),
                                products::updated_at.eq(Utc::now()),
                            ))
                            .execute(conn)
                            .await?;
                    }

                    Ok(OrderWithItems { order, items })
                }
                .scope_boxed()
            })
            .await?;

        info!(
            "Created order {} at business {} for {}",
            result.order.id, result.order.business_id, result.order.total
        );
        Ok(result)
    }

    pub async fn list_orders(
        &self,
        caller: &AuthenticatedUser,
        query: OrderListQuery,
    ) -> Result<Page<Order>, ServiceError> {
        let page = PageRequest::new(query.page, query.per_page);
        let mut conn = self.diesel_pool.get().await?;

        let total = scoped_orders(caller, &query)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let items = scoped_orders(caller, &query)
            .select(Order::as_select())
            .order((orders::created_at.desc(), orders::id.desc()))
            .limit(page.limit())
            .offset(page.offset())
            .load(&mut conn)
            .await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn get_order(
        &self,
        caller: &AuthenticatedUser,
        order_id: Uuid,
    ) -> Result<OrderWithItems, ServiceError> {
        let mut conn = self.diesel_pool.get().await?;
        let order = Order::find_by_id(&mut conn, order_id)
            .await
            .map_err(ServiceError::not_found("Order"))?;

        if !caller.can_view_customer_record(order.customer_id) {
            let business = Business::find_by_id(&mut conn, order.business_id)
                .await
                .map_err(ServiceError::not_found("Business"))?;
            if !business.is_owned_by(caller.user_id) {
                return Err(ServiceError::ResourceNotFound("Order"));
            }
        }

        let items = order.items(&mut conn).await?;
        Ok(OrderWithItems { order, items })
    }

    pub async fn ship(&self, caller: &AuthenticatedUser, order_id: Uuid) -> Result<Order, ServiceError> {
        self.fulfil(caller, order_id, OrderStatus::Shipped).await
    }

    pub async fn deliver(
        &self,
        caller: &AuthenticatedUser,
        order_id: Uuid,
    ) -> Result<Order, ServiceError> {
        self.fulfil(caller, order_id, OrderStatus::Delivered).await
    }

    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    async fn fulfil(
        &self,
        caller: &AuthenticatedUser,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<Order, ServiceError> {
        let caller = caller.clone();
        let mut conn = self.diesel_pool.get().await?;

        let order = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let order = Order::lock_for_update(conn, order_id)
                        .await
                        .map_err(ServiceError::not_found("Order"))?;
                    let business = Business::find_by_id(conn, order.business_id)
                        .await
                        .map_err(ServiceError::not_found("Business"))?;
                    caller.require_business_manager(business.owner_id)?;

                    check_transition(&order, next)?;
                    set_status(conn, order.id, next).await
                }
                .scope_boxed()
            })
            .await?;

        info!("Order {} is now {}", order.id, order.status);
        Ok(order)
    }

    /// Cancel a pending order and put its items back in stock.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn cancel(&self, caller: &AuthenticatedUser, order_id: Uuid) -> Result<Order, ServiceError> {
        let caller = caller.clone();
        let mut conn = self.diesel_pool.get().await?;

        let order = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let order = Order::lock_for_update(conn, order_id)
                        .await
                        .map_err(ServiceError::not_found("Order"))?;

                    if order.customer_id != caller.user_id {
                        let business = Business::find_by_id(conn, order.business_id)
                            .await
                            .map_err(ServiceError::not_found("Business"))?;
                        caller.require_business_manager(business.owner_id)?;
                    }

                    check_transition(&order, OrderStatus::Cancelled)?;

                    let items = order.items(conn).await?;
                    let mut product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
                    product_ids.sort();
                    product_ids.dedup();
                    Product::lock_many(conn, &product_ids).await?;

                    for item in &items {
                        diesel::update(products::table.find(item.product_id))
                            .set((
                                products::stock.eq(products::stock + item.quantity),
                                products::updated_at.eq(Utc::now()),
                            ))
                            .execute(conn)
                            .await?;
                    }

                    set_status(conn, order.id, OrderStatus::Cancelled).await
                }
                .scope_boxed()
            })
            .await?;

        info!("Order {} cancelled and restocked", order.id);
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, quantity: i32) -> OrderItemRequest {
        OrderItemRequest {
            product_id,
            quantity,
        }
    }

    #[test]
    fn test_merge_order_lines_combines_duplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let merged = merge_order_lines(&[line(a, 2), line(b, 1), line(a, 3)]).unwrap();
        assert_eq!(merged, vec![(a, 5), (b, 1)]);
    }

    #[test]
    fn test_merge_order_lines_caps_quantity() {
        let a = Uuid::new_v4();
        assert!(merge_order_lines(&[line(a, 60), line(a, 40)]).is_err());
        assert!(merge_order_lines(&[line(a, 60), line(a, 39)]).is_ok());
    }

    #[test]
    fn test_check_transition_only_pending_cancels() {
        let now = Utc::now();
        let mut order = Order {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            status: "pending".to_string(),
            total: 1000,
            created_at: now,
            updated_at: now,
        };
        assert!(check_transition(&order, OrderStatus::Cancelled).is_ok());

        order.status = "paid".to_string();
        assert!(check_transition(&order, OrderStatus::Cancelled).is_err());
        assert!(check_transition(&order, OrderStatus::Shipped).is_ok());
    }
}
