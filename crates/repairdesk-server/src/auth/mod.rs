//! Identity and access for Repair Desk.
//!
//! Provides JWT token management, password hashing and the per-call
//! [`Principal`] derived from a verified bearer token.

pub mod claims;
pub mod jwt;
pub mod password;
pub mod principal;

pub use claims::Claims;
pub use jwt::JwtManager;
pub use principal::{Principal, authenticate, bearer_token};
