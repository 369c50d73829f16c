// Admin user management

use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    app::AppState,
    config::Permission,
    db::DieselPool,
    middleware::AuthenticatedUser,
    models::{
        pagination::{Page, PageRequest},
        user::{AdminUserUpdateRequest, User, UserListQuery, UserProfile, UserUpdate},
    },
    schema::users,
    utils::{service_error::ServiceError, validation::ilike_pattern},
};

fn filtered_users(query: &UserListQuery) -> users::BoxedQuery<'static, Pg> {
    let mut q = users::table.into_boxed();

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = ilike_pattern(search);
        q = q.filter(
            users::full_name
                .ilike(pattern.clone())
                .or(users::email.ilike(pattern)),
        );
    }
    if let Some(role) = query.role {
        q = q.filter(users::role.eq(role.as_str()));
    }
    if let Some(is_active) = query.is_active {
        q = q.filter(users::is_active.eq(is_active));
    }

    q
}

pub struct UserService {
    diesel_pool: DieselPool,
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
        }
    }

    #[instrument(skip(self, caller, query), fields(admin_id = %caller.user_id))]
    pub async fn list_users(
        &self,
        caller: &AuthenticatedUser,
        query: UserListQuery,
    ) -> Result<Page<UserProfile>, ServiceError> {
        caller.require(Permission::ManageUsers)?;
        let page = PageRequest::new(query.page, query.per_page);
        let mut conn = self.diesel_pool.get().await?;

        let total = filtered_users(&query)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let items = filtered_users(&query)
            .select(User::as_select())
            .order(users::created_at.desc())
            .limit(page.limit())
            .offset(page.offset())
            .load::<User>(&mut conn)
            .await?;

        Ok(Page::new(items, total, page).map(UserProfile::from))
    }

    #[instrument(skip(self, admin, request), fields(admin_id = %admin.user_id))]
    pub async fn update_user(
        &self,
        admin: &AuthenticatedUser,
        user_id: Uuid,
        request: AdminUserUpdateRequest,
    ) -> Result<UserProfile, ServiceError> {
        admin.require(Permission::ManageUsers)?;
        if request.is_active.is_none() && request.role.is_none() {
            return Err(ServiceError::validation("Nothing to update"));
        }

        // Admins cannot lock themselves out
        if user_id == admin.user_id
            && (request.is_active == Some(false)
                || request.role.is_some_and(|r| r != admin.role))
        {
            return Err(ServiceError::forbidden(
                "Admins cannot deactivate or demote their own account",
            ));
        }

        let mut conn = self.diesel_pool.get().await?;
        let update = UserUpdate {
            role: request.role.map(|r| r.as_str().to_string()),
            is_active: request.is_active,
            updated_at: Some(Utc::now()),
        };

        let user = diesel::update(users::table.find(user_id))
            .set(&update)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(ServiceError::not_found("User"))?;

        info!(
            "Admin {} updated user {}: role={:?} is_active={:?}",
            admin.user_id, user.id, request.role, request.is_active
        );

        Ok(user.into())
    }
}
