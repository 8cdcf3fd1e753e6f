//! User management: accounts, technician list and the bootstrap manager.

use repairdesk_core::config::BootstrapConfig;
use repairdesk_core::db::DatabaseError;
use serde::Deserialize;
use tracing::{error, info, instrument};

use crate::auth::{Principal, password};
use crate::error::{ApiError, ApiResult, ValidationError};
use crate::policy::{Action, Role, authorize};
use crate::storage::{NewUser, RepairDatabase, User};

const MIN_LOGIN_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 3;

/// Body of a create-user or register call, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// A validated account, password still in clear.
#[derive(Debug, Clone)]
pub struct ValidUser {
    pub full_name: String,
    pub phone: String,
    pub login: String,
    pub password: String,
    pub role: Role,
}

impl CreateUserRequest {
    /// Trim and check every field. `role` falls back to `default_role`.
    pub fn validate(self, default_role: Role) -> Result<ValidUser, ValidationError> {
        let mut empty = Vec::new();
        let mut text = |name: &str, value: Option<String>| {
            let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
            if value.is_empty() {
                empty.push(name.to_string());
            }
            value
        };

        let full_name = text("full_name", self.full_name);
        let phone = text("phone", self.phone);
        let login = text("login", self.login);
        let password = text("password", self.password);

        if !empty.is_empty() {
            let message = format!("Fields cannot be empty: {}", empty.join(", "));
            return Err(ValidationError {
                fields: empty,
                message,
            });
        }
        if login.chars().count() < MIN_LOGIN_LEN {
            return Err(ValidationError::field(
                "login",
                format!("Login must be at least {MIN_LOGIN_LEN} characters"),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::field(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        let role = match self.role.as_deref().map(str::trim) {
            None | Some("") => default_role,
            Some(raw) => raw.parse().map_err(|_| {
                let allowed: Vec<_> = Role::ALL.iter().map(|r| r.as_str()).collect();
                ValidationError::field(
                    "role",
                    format!("Role must be one of: {}", allowed.join(", ")),
                )
            })?,
        };

        Ok(ValidUser {
            full_name,
            phone,
            login,
            password,
            role,
        })
    }
}

/// Hash the password and insert. A taken login is a validation error and
/// leaves the store unchanged.
pub(crate) async fn insert_user(db: &RepairDatabase, user: &ValidUser) -> ApiResult<User> {
    let hash = password::hash_password(&user.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::Internal
    })?;

    let created = db
        .create_user(&NewUser {
            full_name: &user.full_name,
            phone: &user.phone,
            login: &user.login,
            password_hash: &hash,
            role: user.role,
        })
        .await
        .map_err(|e| match e {
            DatabaseError::Conflict(_) => ApiError::Validation(ValidationError::field(
                "login",
                "A user with this login already exists",
            )),
            other => other.into(),
        })?;

    info!(user_id = created.user_id, login = %created.login, role = %created.role, "User created");
    Ok(created)
}

pub struct UserService {
    db: RepairDatabase,
}

impl UserService {
    pub const fn new(db: RepairDatabase) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(op = "create_user", caller = principal.user_id))]
    pub async fn create_user(
        &self,
        principal: &Principal,
        input: CreateUserRequest,
    ) -> ApiResult<User> {
        authorize(principal, Action::ManageUsers)?;
        let user = input.validate(Role::Client)?;
        insert_user(&self.db, &user).await
    }

    #[instrument(skip(self), fields(op = "list_users", caller = principal.user_id))]
    pub async fn list_users(&self, principal: &Principal) -> ApiResult<Vec<User>> {
        authorize(principal, Action::ManageUsers)?;
        Ok(self.db.list_users().await?)
    }

    /// Technicians available for assignment, ordered by name.
    #[instrument(skip(self), fields(op = "list_masters", caller = principal.user_id))]
    pub async fn list_masters(&self, principal: &Principal) -> ApiResult<Vec<User>> {
        authorize(principal, Action::ListTechnicians)?;
        Ok(self.db.list_users_with_role(Role::Master).await?)
    }

    /// Remove an account. Requests and comments referring to it are kept.
    #[instrument(skip(self), fields(op = "delete_user", caller = principal.user_id))]
    pub async fn delete_user(&self, principal: &Principal, user_id: i64) -> ApiResult<()> {
        authorize(principal, Action::ManageUsers)?;
        if user_id == principal.user_id {
            return Err(ValidationError::field("user_id", "You cannot delete your own account").into());
        }
        if !self.db.delete_user(user_id).await? {
            return Err(ApiError::not_found("User", user_id));
        }
        info!(user_id, "User deleted");
        Ok(())
    }

    /// Create the configured manager account unless its login already exists.
    ///
    /// Returns whether an account was created.
    #[instrument(skip(self, bootstrap), fields(op = "bootstrap", login = %bootstrap.login))]
    pub async fn ensure_bootstrap_manager(&self, bootstrap: &BootstrapConfig) -> ApiResult<bool> {
        if self.db.find_user_by_login(bootstrap.login.trim()).await?.is_some() {
            return Ok(false);
        }

        let phone = if bootstrap.phone.trim().is_empty() {
            "-".to_string()
        } else {
            bootstrap.phone.clone()
        };
        let user = CreateUserRequest {
            full_name: Some(bootstrap.full_name.clone()),
            phone: Some(phone),
            login: Some(bootstrap.login.clone()),
            password: Some(bootstrap.password.clone()),
            role: None,
        }
        .validate(Role::Manager)?;

        insert_user(&self.db, &user).await?;
        Ok(true)
    }
}
