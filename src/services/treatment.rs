// Treatment catalogue per business

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
        treatment::{
            CreateTreatmentRequest, NewTreatment, Treatment, TreatmentListQuery, TreatmentUpdate,
            UpdateTreatmentRequest,
        },
    },
    schema::treatments,
    services::business::managed_business,
    utils::{
        service_error::ServiceError,
        validation::{ilike_pattern, trim_and_validate_field, trim_optional_field},
    },
};

fn filtered_treatments(
    business_id: Uuid,
    query: &TreatmentListQuery,
    include_inactive: bool,
) -> treatments::BoxedQuery<'static, Pg> {
    let mut q = treatments::table
        .filter(treatments::business_id.eq(business_id))
        .into_boxed();

    if !include_inactive {
        q = q.filter(treatments::is_active.eq(true));
    }
    if let Some(category) = query.category.as_deref().filter(|s| !s.is_empty()) {
        q = q.filter(treatments::category.eq(category.to_string()));
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        q = q.filter(treatments::name.ilike(ilike_pattern(search)));
    }

    q
}

pub struct TreatmentService {
    diesel_pool: DieselPool,
}

impl TreatmentService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
        }
    }

    #[instrument(skip(self, caller, request), fields(user_id = %caller.user_id))]
    pub async fn create_treatment(
        &self,
        caller: &AuthenticatedUser,
        business_id: Uuid,
        request: CreateTreatmentRequest,
    ) -> Result<Treatment, ServiceError> {
        request.validate()?;
        let mut conn = self.diesel_pool.get().await?;
        managed_business(&mut conn, caller, business_id).await?;

        let treatment = diesel::insert_into(treatments::table)
            .values(NewTreatment {
                business_id,
                name: trim_and_validate_field(&request.name, true)
                    .map_err(ServiceError::validation)?,
                description: trim_optional_field(request.description.as_ref()),
                category: request.category,
                price: request.price,
                duration_minutes: request.duration_minutes,
            })
            .returning(Treatment::as_returning())
            .get_result(&mut conn)
            .await?;

        info!("Created treatment {} for business {}", treatment.id, business_id);
        Ok(treatment)
    }

    /// Active treatments only, unless the caller manages the business.
    pub async fn list_treatments(
        &self,
        caller: Option<&AuthenticatedUser>,
        business_id: Uuid,
        query: TreatmentListQuery,
    ) -> Result<Page<Treatment>, ServiceError> {
        let page = PageRequest::new(query.page, query.per_page);
        let mut conn = self.diesel_pool.get().await?;

        let business = Business::find_by_id(&mut conn, business_id)
            .await
            .map_err(ServiceError::not_found("Business"))?;
        let include_inactive = caller.is_some_and(|c| c.can_manage_business(business.owner_id));

        let total = filtered_treatments(business_id, &query, include_inactive)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let items = filtered_treatments(business_id, &query, include_inactive)
            .select(Treatment::as_select())
            .order((treatments::category.asc(), treatments::name.asc()))
            .limit(page.limit())
            .offset(page.offset())
            .load(&mut conn)
            .await?;

        Ok(Page::new(items, total, page))
    }

    #[instrument(skip(self, caller, request), fields(user_id = %caller.user_id))]
    pub async fn update_treatment(
        &self,
        caller: &AuthenticatedUser,
        treatment_id: Uuid,
        request: UpdateTreatmentRequest,
    ) -> Result<Treatment, ServiceError> {
        request.validate()?;
        let name = request
            .name
            .as_deref()
            .map(|n| trim_and_validate_field(n, true))
            .transpose()
            .map_err(ServiceError::validation)?;

        let mut conn = self.diesel_pool.get().await?;

        let treatment = Treatment::find_by_id(&mut conn, treatment_id)
            .await
            .map_err(ServiceError::not_found("Treatment"))?;
        managed_business(&mut conn, caller, treatment.business_id).await?;

        let update = TreatmentUpdate {
            name,
            description: request.description.as_ref().map(|d| trim_optional_field(Some(d))),
            category: request.category,
            price: request.price,
            duration_minutes: request.duration_minutes,
            is_active: request.is_active,
            updated_at: Some(Utc::now()),
        };

        let treatment = diesel::update(treatments::table.find(treatment_id))
            .set(&update)
            .returning(Treatment::as_returning())
            .get_result(&mut conn)
            .await?;

        info!("Updated treatment {}", treatment.id);
        Ok(treatment)
    }
}
