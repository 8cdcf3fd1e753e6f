//! HTTP server for Repair Desk: services, extractors and routes.

pub mod auth_svc;
pub mod comment_svc;
pub mod extract;
pub mod request_svc;
pub mod routes;
pub mod stats_svc;
pub mod user_svc;

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod test_helpers;

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod request_svc_tests;
#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod user_svc_tests;

pub use auth_svc::{AuthService, LoginRequest, LoginResponse};
pub use comment_svc::CommentService;
pub use request_svc::RequestService;
pub use routes::{AppState, build_router};
pub use stats_svc::{StatsService, Statistics};
pub use user_svc::UserService;
