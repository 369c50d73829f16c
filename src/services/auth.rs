// Registration, login and token refresh

use std::sync::Arc;

use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    app_config::AppConfig,
    db::DieselPool,
    models::{
        auth::{LoginRequest, RefreshRequest, RegisterRequest, TokenResponse},
        user::{NewUser, User, UserProfile, UserRole},
        wallet::{NewWallet, Wallet},
    },
    services::jwt::JwtService,
    utils::{
        password::{dummy_verify, hash_password, verify_password},
        service_error::ServiceError,
        validation::{normalize_email, trim_and_validate_field, trim_optional_field},
    },
};

pub struct AuthService {
    diesel_pool: DieselPool,
    jwt_service: Arc<JwtService>,
    config: Arc<AppConfig>,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
            jwt_service: state.jwt_service.clone(),
            config: state.config.clone(),
        }
    }

    fn token_response(&self, user: User) -> Result<TokenResponse, ServiceError> {
        let pair = self
            .jwt_service
            .issue_pair(user.id, &user.email, user.role_enum())?;

        Ok(TokenResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: pair.expires_in,
            user: user.into(),
        })
    }

    /// Create a user and their wallet in one transaction.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<TokenResponse, ServiceError> {
        request.validate()?;

        let role = request.role.unwrap_or(UserRole::Customer);
        if !role.is_self_assignable() {
            warn!("Rejected self-registration with role {}", role);
            return Err(ServiceError::forbidden("This role cannot be self-assigned"));
        }

        let email = normalize_email(&request.email);
        let full_name =
            trim_and_validate_field(&request.full_name, true).map_err(ServiceError::validation)?;
        let phone = trim_optional_field(request.phone.as_ref());
        let password_hash = hash_password(&request.password)?;
        let currency = self.config.business.currency.clone();

        let mut conn = self.diesel_pool.get().await?;

        if User::find_by_email(&mut conn, &email).await?.is_some() {
            return Err(ServiceError::Conflict("Email is already registered".to_string()));
        }

        let user = conn
            .transaction::<_, ServiceError, _>(|conn| {
                async move {
                    let user = User::create(
                        conn,
                        NewUser {
                            email,
                            password_hash,
                            full_name,
                            phone,
                            role: role.as_str().to_string(),
                        },
                    )
                    .await?;

                    Wallet::create(
                        conn,
                        NewWallet {
                            user_id: user.id,
                            currency,
                        },
                    )
                    .await?;

                    Ok(user)
                }
                .scope_boxed()
            })
            .await?;

        info!("Registered user {} with role {}", user.id, role);
        self.token_response(user)
    }

    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, ServiceError> {
        request.validate()?;
        let email = normalize_email(&request.email);

        let mut conn = self.diesel_pool.get().await?;
        let user = match User::find_by_email(&mut conn, &email).await? {
            Some(user) => user,
            None => {
                dummy_verify(&request.password);
                return Err(ServiceError::InvalidCredentials);
            },
        };

        if !verify_password(&request.password, &user.password_hash)? {
            warn!("Failed login for user {}", user.id);
            return Err(ServiceError::InvalidCredentials);
        }

        if !user.is_active {
            warn!("Login attempt on deactivated user {}", user.id);
            return Err(ServiceError::InvalidCredentials);
        }

        info!("User {} logged in", user.id);
        self.token_response(user)
    }

    /// Exchange a refresh token for a new pair. Role and active flag are re-read
    /// from the database, so deactivation takes effect at the next refresh.
    #[instrument(skip(self, request))]
    pub async fn refresh(&self, request: RefreshRequest) -> Result<TokenResponse, ServiceError> {
        request.validate()?;
        let claims = self.jwt_service.validate_refresh_token(&request.refresh_token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ServiceError::Unauthorized)?;

        let mut conn = self.diesel_pool.get().await?;
        let user = User::find_by_id(&mut conn, user_id).await.map_err(|e| match e {
            diesel::result::Error::NotFound => ServiceError::Unauthorized,
            other => other.into(),
        })?;

        if !user.is_active {
            return Err(ServiceError::Unauthorized);
        }

        self.token_response(user)
    }

    pub async fn me(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        let mut conn = self.diesel_pool.get().await?;
        let user = User::find_by_id(&mut conn, user_id)
            .await
            .map_err(ServiceError::not_found("User"))?;
        Ok(user.into())
    }
}
