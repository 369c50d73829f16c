// Retail product catalogue per business

use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    db::DieselPool,
    middleware::AuthenticatedUser,
    models::{
        business::Business,
        pagination::{Page, PageRequest},
        product::{
            CreateProductRequest, NewProduct, Product, ProductListQuery, ProductUpdate,
            UpdateProductRequest,
        },
    },
    schema::products,
    services::business::managed_business,
    utils::{
        service_error::ServiceError,
        validation::{ilike_pattern, trim_and_validate_field, trim_optional_field},
    },
};

fn filtered_products(
    business_id: Uuid,
    query: &ProductListQuery,
    include_inactive: bool,
) -> products::BoxedQuery<'static, Pg> {
    let mut q = products::table
        .filter(products::business_id.eq(business_id))
        .into_boxed();

    if !include_inactive {
        q = q.filter(products::is_active.eq(true));
    }
    if query.in_stock == Some(true) {
        q = q.filter(products::stock.gt(0));
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        q = q.filter(products::name.ilike(ilike_pattern(search)));
    }

    q
}

pub struct ProductService {
    diesel_pool: DieselPool,
}

impl ProductService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
        }
    }

    #[instrument(skip(self, caller, request), fields(user_id = %caller.user_id))]
    pub async fn create_product(
        &self,
        caller: &AuthenticatedUser,
        business_id: Uuid,
        request: CreateProductRequest,
    ) -> Result<Product, ServiceError> {
        request.validate()?;
        let mut conn = self.diesel_pool.get().await?;
        managed_business(&mut conn, caller, business_id).await?;

        let product = diesel::insert_into(products::table)
            .values(NewProduct {
                business_id,
                name: trim_and_validate_field(&request.name, true)
                    .map_err(ServiceError::validation)?,
                description: trim_optional_field(request.description.as_ref()),
                price: request.price,
                stock: request.stock,
            })
            .returning(Product::as_returning())
            .get_result(&mut conn)
            .await?;

        info!("Created product {} for business {}", product.id, business_id);
        Ok(product)
    }

    pub async fn list_products(
        &self,
        caller: Option<&AuthenticatedUser>,
        business_id: Uuid,
        query: ProductListQuery,
    ) -> Result<Page<Product>, ServiceError> {
        let page = PageRequest::new(query.page, query.per_page);
        let mut conn = self.diesel_pool.get().await?;

        let business = Business::find_by_id(&mut conn, business_id)
            .await
            .map_err(ServiceError::not_found("Business"))?;
        let include_inactive = caller.is_some_and(|c| c.can_manage_business(business.owner_id));

        let total = filtered_products(business_id, &query, include_inactive)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let items = filtered_products(business_id, &query, include_inactive)
            .select(Product::as_select())
            .order((products::name.asc(), products::id.asc()))
            .limit(page.limit())
            .offset(page.offset())
            .load(&mut conn)
            .await?;

        Ok(Page::new(items, total, page))
    }

    #[instrument(skip(self, caller, request), fields(user_id = %caller.user_id))]
    pub async fn update_product(
        &self,
        caller: &AuthenticatedUser,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<Product, ServiceError> {
        request.validate()?;
        let name = request
            .name
            .as_deref()
            .map(|n| trim_and_validate_field(n, true))
            .transpose()
            .map_err(ServiceError::validation)?;

        let mut conn = self.diesel_pool.get().await?;

        let product = Product::find_by_id(&mut conn, product_id)
            .await
            .map_err(ServiceError::not_found("Product"))?;
        managed_business(&mut conn, caller, product.business_id).await?;

        let update = ProductUpdate {
            name,
            description: request.description.as_ref().map(|d| trim_optional_field(Some(d))),
            price: request.price,
            stock: request.stock,
            is_active: request.is_active,
            updated_at: Some(Utc::now()),
        };

        let product = diesel::update(products::table.find(product_id))
            .set(&update)
            .returning(Product::as_returning())
            .get_result(&mut conn)
            .await?;

        info!("Updated product {}", product.id);
        Ok(product)
    }
}
