//! Role-based authorization policy.
//!
//! Every rule lives in [`is_allowed`]: a single match over (role, action).
//! Ownership-dependent actions carry the owning user id so the decision stays
//! a pure function with no store access.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::auth::Principal;
use crate::error::ApiError;

/// Closed set of user roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum Role {
    Client,
    /// Repair technician.
    Master,
    Operator,
    Manager,
}

impl Role {
    pub const ALL: [Self; 4] = [Self::Client, Self::Master, Self::Operator, Self::Manager];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "Client",
            Self::Master => "Master",
            Self::Operator => "Operator",
            Self::Manager => "Manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

/// An operation a principal attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListRequests,
    ReadRequest { client_id: i64 },
    CreateRequest,
    UpdateRequest,
    DeleteRequest,
    CreateComment,
    DeleteComment { author_id: i64 },
    ManageUsers,
    ListTechnicians,
}

/// Which rows of the request table a principal may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestScope {
    All,
    /// Only requests owned by this client.
    OwnedBy(i64),
    /// Only requests assigned to this technician.
    AssignedTo(i64),
}

/// Decide whether `role` acting as `user_id` may perform `action`.
pub const fn is_allowed(role: Role, user_id: i64, action: Action) -> bool {
    match action {
        Action::ListRequests
        | Action::CreateRequest
        | Action::CreateComment
        | Action::ListTechnicians => true,
        Action::ReadRequest { client_id } => match role {
            Role::Client => client_id == user_id,
            Role::Master | Role::Operator | Role::Manager => true,
        },
        Action::UpdateRequest => matches!(role, Role::Master | Role::Operator | Role::Manager),
        Action::DeleteRequest | Action::ManageUsers => matches!(role, Role::Manager),
        Action::DeleteComment { author_id } => {
            author_id == user_id || matches!(role, Role::Manager)
        }
    }
}

/// Row filter applied to request listings for this principal.
pub const fn request_scope(principal: &Principal) -> RequestScope {
    match principal.role {
        Role::Client => RequestScope::OwnedBy(principal.user_id),
        Role::Master => RequestScope::AssignedTo(principal.user_id),
        Role::Operator | Role::Manager => RequestScope::All,
    }
}

/// [`is_allowed`] as a `Result`, for use with `?` in services.
pub fn authorize(principal: &Principal, action: Action) -> Result<(), ApiError> {
    if is_allowed(principal.role, principal.user_id, action) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(denial_message(action)))
    }
}

const fn denial_message(action: Action) -> &'static str {
    match action {
        Action::ReadRequest { .. } => "Access to this request is denied",
        Action::DeleteRequest => "Only a manager can delete requests",
        Action::DeleteComment { .. } => "Only the author or a manager can delete this comment",
        Action::ManageUsers => "Only a manager can manage users",
        Action::ListRequests
        | Action::CreateRequest
        | Action::UpdateRequest
        | Action::CreateComment
        | Action::ListTechnicians => "Insufficient permissions",
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const ME: i64 = 10;
    const OTHER: i64 = 20;

    #[test]
    fn role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("manager".parse::<Role>().is_err());
        assert!("Менеджер".parse::<Role>().is_err());
    }

    #[test]
    fn everyone_may_list_comment_and_see_technicians() {
        for role in Role::ALL {
            assert!(is_allowed(role, ME, Action::ListRequests));
            assert!(is_allowed(role, ME, Action::CreateRequest));
            assert!(is_allowed(role, ME, Action::CreateComment));
            assert!(is_allowed(role, ME, Action::ListTechnicians));
        }
    }

    #[test]
    fn clients_only_read_their_own_requests() {
        assert!(is_allowed(Role::Client, ME, Action::ReadRequest { client_id: ME }));
        assert!(!is_allowed(Role::Client, ME, Action::ReadRequest { client_id: OTHER }));

        for role in [Role::Master, Role::Operator, Role::Manager] {
            assert!(is_allowed(role, ME, Action::ReadRequest { client_id: OTHER }));
        }
    }

    #[test]
    fn update_excludes_clients() {
        assert!(!is_allowed(Role::Client, ME, Action::UpdateRequest));
        assert!(is_allowed(Role::Master, ME, Action::UpdateRequest));
        assert!(is_allowed(Role::Operator, ME, Action::UpdateRequest));
        assert!(is_allowed(Role::Manager, ME, Action::UpdateRequest));
    }

    #[test]
    fn delete_request_and_user_management_are_manager_only() {
        for role in Role::ALL {
            let expected = role == Role::Manager;
            assert_eq!(is_allowed(role, ME, Action::DeleteRequest), expected);
            assert_eq!(is_allowed(role, ME, Action::ManageUsers), expected);
        }
    }

    #[test]
    fn comment_delete_needs_authorship_or_manager() {
        for role in Role::ALL {
            assert!(is_allowed(role, ME, Action::DeleteComment { author_id: ME }));
            assert_eq!(
                is_allowed(role, ME, Action::DeleteComment { author_id: OTHER }),
                role == Role::Manager
            );
        }
    }

    #[test]
    fn scope_follows_role() {
        let p = |role| Principal::new(ME, role, "x");
        assert_eq!(request_scope(&p(Role::Client)), RequestScope::OwnedBy(ME));
        assert_eq!(request_scope(&p(Role::Master)), RequestScope::AssignedTo(ME));
        assert_eq!(request_scope(&p(Role::Operator)), RequestScope::All);
        assert_eq!(request_scope(&p(Role::Manager)), RequestScope::All);
    }

    #[test]
    fn authorize_maps_denial_to_forbidden() {
        let client = Principal::new(ME, Role::Client, "Alice");
        let err = authorize(&client, Action::DeleteRequest).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(authorize(&client, Action::CreateComment).is_ok());
    }
}
