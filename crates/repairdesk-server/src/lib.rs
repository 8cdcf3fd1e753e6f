//! Repair Desk Server Library
//!
//! Core functionality for the repair-request desk:
//! - SQLite storage for users, repair requests and comments
//! - JWT authentication and password hashing
//! - Role policy and the request lifecycle
//! - HTTP services and routes (requests, comments, users, statistics)

pub mod auth;
pub mod error;
pub mod lifecycle;
pub mod policy;
pub mod server;
pub mod storage;
