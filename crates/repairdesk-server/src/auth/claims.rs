//! JWT claims structure for Repair Desk access tokens.

use serde::{Deserialize, Serialize};

use crate::policy::Role;

/// JWT claims embedded in access tokens.
///
/// The role is fixed at issuance; it is not re-read from the store while the
/// token is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (numeric user ID, encoded as a string).
    pub sub: String,
    /// Role at issuance time.
    pub role: Role,
    /// Display name at issuance time.
    pub name: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// Subject as a user id, `None` if the subject is not numeric.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}
