//! `SQLite` storage for Repair Desk.
//!
//! Provides persistence for users, repair requests and comments, plus the
//! read-only rollups behind the statistics endpoints.

mod db;
mod models;
mod queries_comments;
mod queries_requests;
mod queries_stats;
mod queries_users;


pub use db::{DatabaseError, RepairDatabase};
pub use models::*;
pub use queries_requests::RequestFilter;
pub use queries_users::NewUser;
