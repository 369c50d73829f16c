// Business (salon) listing and management

use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    config::Permission,
    db::DieselPool,
    middleware::AuthenticatedUser,
    models::{
        business::{
            Business, BusinessListQuery, BusinessUpdate, CreateBusinessRequest, NewBusiness,
            UpdateBusinessRequest,
        },
        pagination::{Page, PageRequest},
    },
    schema::businesses,
    utils::{
        service_error::ServiceError,
        validation::{ilike_pattern, trim_and_validate_field, trim_optional_field},
    },
};

fn filtered_businesses(
    query: &BusinessListQuery,
    include_inactive: bool,
) -> businesses::BoxedQuery<'static, Pg> {
    let mut q = businesses::table.into_boxed();

    if !include_inactive {
        q = q.filter(businesses::is_active.eq(true));
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = ilike_pattern(search);
        q = q.filter(
            businesses::name
                .ilike(pattern.clone())
                .or(businesses::description.ilike(pattern)),
        );
    }
    if let Some(city) = query.city.as_deref().filter(|s| !s.trim().is_empty()) {
        q = q.filter(businesses::city.ilike(ilike_pattern(city)));
    }

    q
}

/// Load a business and check the caller may manage it.
pub async fn managed_business(
    conn: &mut AsyncPgConnection,
    caller: &AuthenticatedUser,
    business_id: Uuid,
) -> Result<Business, ServiceError> {
    let business = Business::find_by_id(conn, business_id)
        .await
        .map_err(ServiceError::not_found("Business"))?;
    caller.require_business_manager(business.owner_id)?;
    Ok(business)
}

pub struct BusinessService {
    diesel_pool: DieselPool,
}

impl BusinessService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
        }
    }

    #[instrument(skip(self, caller, request), fields(owner_id = %caller.user_id))]
    pub async fn create_business(
        &self,
        caller: &AuthenticatedUser,
        request: CreateBusinessRequest,
    ) -> Result<Business, ServiceError> {
        caller.require(Permission::ManageOwnBusiness)?;
        request.validate()?;

        let new_business = NewBusiness {
            owner_id: caller.user_id,
            name: trim_and_validate_field(&request.name, true).map_err(ServiceError::validation)?,
            description: trim_optional_field(request.description.as_ref()),
            city: trim_and_validate_field(&request.city, true).map_err(ServiceError::validation)?,
            address: trim_optional_field(request.address.as_ref()),
            phone: trim_optional_field(request.phone.as_ref()),
        };

        let mut conn = self.diesel_pool.get().await?;
        let business = diesel::insert_into(businesses::table)
            .values(&new_business)
            .returning(Business::as_returning())
            .get_result(&mut conn)
            .await?;

        info!("Created business {} ({})", business.id, business.name);
        Ok(business)
    }

    /// Public listing; inactive businesses are only shown to admins.
    pub async fn list_businesses(
        &self,
        caller: Option<&AuthenticatedUser>,
        query: BusinessListQuery,
    ) -> Result<Page<Business>, ServiceError> {
        let include_inactive = caller.is_some_and(|c| c.has_permission(Permission::ManageAnyBusiness));
        let page = PageRequest::new(query.page, query.per_page);
        let mut conn = self.diesel_pool.get().await?;

        let total = filtered_businesses(&query, include_inactive)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let items = filtered_businesses(&query, include_inactive)
            .select(Business::as_select())
            .order((businesses::name.asc(), businesses::id.asc()))
            .limit(page.limit())
            .offset(page.offset())
            .load(&mut conn)
            .await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn get_business(
        &self,
        caller: Option<&AuthenticatedUser>,
        business_id: Uuid,
    ) -> Result<Business, ServiceError> {
        let mut conn = self.diesel_pool.get().await?;
        let business = Business::find_by_id(&mut conn, business_id)
            .await
            .map_err(ServiceError::not_found("Business"))?;

        if !business.is_active && !caller.is_some_and(|c| c.can_manage_business(business.owner_id)) {
            return Err(ServiceError::ResourceNotFound("Business"));
        }
        Ok(business)
    }

    #[instrument(skip(self, caller, request), fields(user_id = %caller.user_id))]
    pub async fn update_business(
        &self,
        caller: &AuthenticatedUser,
        business_id: Uuid,
        request: UpdateBusinessRequest,
    ) -> Result<Business, ServiceError> {
        request.validate()?;
        let name = request
            .name
            .as_deref()
            .map(|n| trim_and_validate_field(n, true))
            .transpose()
            .map_err(ServiceError::validation)?;
        let city = request
            .city
            .as_deref()
            .map(|c| trim_and_validate_field(c, true))
            .transpose()
            .map_err(ServiceError::validation)?;

        let mut conn = self.diesel_pool.get().await?;
        managed_business(&mut conn, caller, business_id).await?;

        let update = BusinessUpdate {
            name,
            description: request.description.as_ref().map(|d| trim_optional_field(Some(d))),
            city,
            address: request.address.as_ref().map(|a| trim_optional_field(Some(a))),
            phone: request.phone.as_ref().map(|p| trim_optional_field(Some(p))),
            is_active: request.is_active,
            updated_at: Some(Utc::now()),
        };

        let business = diesel::update(businesses::table.find(business_id))
            .set(&update)
            .returning(Business::as_returning())
            .get_result(&mut conn)
            .await?;

        info!("Updated business {}", business.id);
        Ok(business)
    }
}
