//! The authenticated caller for one operation.

use serde::Serialize;
use tracing::debug;

use super::jwt::JwtManager;
use crate::error::ApiError;
use crate::policy::Role;

/// Identity and role of the caller, rebuilt from the token on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
    pub full_name: String,
}

impl Principal {
    pub fn new(user_id: i64, role: Role, full_name: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            full_name: full_name.into(),
        }
    }
}

/// Strip the `Bearer ` scheme from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verify a bearer token and build the [`Principal`] it names.
///
/// Every failure (bad signature, expiry, non-numeric subject, unknown role)
/// collapses into [`ApiError::Unauthenticated`].
pub fn authenticate(jwt: &JwtManager, token: &str) -> Result<Principal, ApiError> {
    let claims = jwt.validate(token).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        ApiError::Unauthenticated
    })?;

    let user_id = claims.user_id().ok_or(ApiError::Unauthenticated)?;

    Ok(Principal {
        user_id,
        role: claims.role,
        full_name: claims.name,
    })
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use jsonwebtoken::{EncodingKey, Header};

    const SECRET: &[u8] = b"principal-secret";

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("abc.def"), None);
        assert_eq!(bearer_token("Bearer "), None);
    }

    #[test]
    fn valid_token_yields_principal() {
        let jwt = JwtManager::new(SECRET, 3600);
        let (token, _) = jwt.issue_access_token(42, Role::Operator, "Perina").unwrap();

        let principal = authenticate(&jwt, &token).unwrap();
        assert_eq!(principal, Principal::new(42, Role::Operator, "Perina"));
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        let jwt = JwtManager::new(SECRET, -3600);
        let (token, _) = jwt.issue_access_token(42, Role::Manager, "Kasoo").unwrap();

        assert!(matches!(
            authenticate(&jwt, &token),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn non_numeric_subject_is_unauthenticated() {
        let claims = Claims {
            jti: "j".into(),
            sub: "not-a-number".into(),
            role: Role::Manager,
            name: "Mallory".into(),
            iat: 0,
            exp: i64::MAX / 2,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let jwt = JwtManager::new(SECRET, 3600);
        assert!(matches!(
            authenticate(&jwt, &token),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn unknown_role_is_unauthenticated() {
        let payload = serde_json::json!({
            "jti": "j",
            "sub": "1",
            "role": "Superuser",
            "name": "Mallory",
            "iat": 0,
            "exp": i64::MAX / 2,
        });
        let token = jsonwebtoken::encode(
            &Header::default(),
            &payload,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let jwt = JwtManager::new(SECRET, 3600);
        assert!(matches!(
            authenticate(&jwt, &token),
            Err(ApiError::Unauthenticated)
        ));
    }
}
