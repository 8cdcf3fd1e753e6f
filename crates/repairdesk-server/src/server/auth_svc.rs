//! Login and self-registration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use super::user_svc::{CreateUserRequest, insert_user};
use crate::auth::jwt::JwtManager;
use crate::auth::password;
use crate::error::{ApiError, ApiResult};
use crate::policy::Role;
use crate::storage::{RepairDatabase, User};

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user_id: i64,
    pub role: Role,
    pub full_name: String,
}

pub struct AuthService {
    db: RepairDatabase,
    jwt: Arc<JwtManager>,
}

impl AuthService {
    pub const fn new(db: RepairDatabase, jwt: Arc<JwtManager>) -> Self {
        Self { db, jwt }
    }

    /// Exchange login and password for an access token.
    ///
    /// Unknown login and wrong password are indistinguishable to the caller.
    #[instrument(skip(self, req), fields(op = "login", login = %req.login))]
    pub async fn login(&self, req: LoginRequest) -> ApiResult<LoginResponse> {
        let Some(user) = self.db.find_user_by_login(&req.login).await? else {
            warn!("Login attempt for unknown user");
            return Err(ApiError::InvalidCredentials);
        };

        let valid = password::verify_password(&req.password, &user.password_hash).map_err(|e| {
            error!(user_id = user.user_id, error = %e, "Stored password hash is unreadable");
            ApiError::Internal
        })?;

        if !valid {
            warn!(user_id = user.user_id, "Failed login attempt");
            return Err(ApiError::InvalidCredentials);
        }

        info!(user_id = user.user_id, role = %user.role, "User logged in");
        self.token_for(&user)
    }

    /// Create a `Client` account and log it in. Any requested role is ignored.
    #[instrument(skip(self, req), fields(op = "register"))]
    pub async fn register(&self, mut req: CreateUserRequest) -> ApiResult<LoginResponse> {
        req.role = None;
        let valid = req.validate(Role::Client)?;
        let user = insert_user(&self.db, &valid).await?;
        self.token_for(&user)
    }

    fn token_for(&self, user: &User) -> ApiResult<LoginResponse> {
        let (access_token, expires_in) = self
            .jwt
            .issue_access_token(user.user_id, user.role, &user.full_name)
            .map_err(|e| {
                error!(error = %e, "Token creation failed");
                ApiError::Internal
            })?;

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer",
            expires_in,
            user_id: user.user_id,
            role: user.role,
            full_name: user.full_name.clone(),
        })
    }
}
