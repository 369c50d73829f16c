// User accounts and roles

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::schema::users;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Business,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Business => "business",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(UserRole::Customer),
            "business" => Some(UserRole::Business),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Roles a user may pick for themselves at registration
    pub fn is_self_assignable(&self) -> bool {
        !matches!(self, UserRole::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub points_balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: String,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserUpdate {
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub points_balance: i64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        let role = user.role_enum();
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            role,
            is_active: user.is_active,
            points_balance: user.points_balance,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Matches name or email
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct AdminUserUpdateRequest {
    pub is_active: Option<bool>,
    pub role: Option<UserRole>,
}

impl User {
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        users::table
            .find(user_id)
            .select(User::as_select())
            .first(conn)
            .await
    }

    /// Emails are stored lower-cased, so an exact match on the normalized form suffices
    pub async fn find_by_email(
        conn: &mut AsyncPgConnection,
        normalized_email: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        users::table
            .filter(users::email.eq(normalized_email))
            .select(User::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_user: NewUser,
    ) -> Result<Self, diesel::result::Error> {
        diesel::insert_into(users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(conn)
            .await
    }

    /// Lock the user row for a points balance change.
    pub async fn lock_for_update(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Self, diesel::result::Error> {
        users::table
            .find(user_id)
            .for_update()
            .select(User::as_select())
            .first(conn)
            .await
    }

    /// Unknown stored roles degrade to the least-privileged one
    pub fn role_enum(&self) -> UserRole {
        UserRole::from_string(&self.role).unwrap_or_else(|| {
            tracing::warn!(
                "Invalid role '{}' for user {}, defaulting to customer",
                self.role,
                self.id
            );
            UserRole::Customer
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ayse@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            full_name: "Ayşe Yılmaz".to_string(),
            phone: None,
            role: role.to_string(),
            is_active: true,
            points_balance: 250,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_round_trip() {
        for role in [UserRole::Customer, UserRole::Business, UserRole::Admin] {
            assert_eq!(UserRole::from_string(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_string("superuser"), None);
    }

    #[test]
    fn test_admin_is_not_self_assignable() {
        assert!(UserRole::Customer.is_self_assignable());
        assert!(UserRole::Business.is_self_assignable());
        assert!(!UserRole::Admin.is_self_assignable());
    }

    #[test]
    fn test_invalid_role_degrades_to_customer() {
        assert_eq!(sample_user("root").role_enum(), UserRole::Customer);
        assert_eq!(sample_user("admin").role_enum(), UserRole::Admin);
    }

    #[test]
    fn test_profile_hides_password_hash() {
        let profile = UserProfile::from(sample_user("business"));
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "business");
        assert_eq!(json["points_balance"], 250);
    }
}
