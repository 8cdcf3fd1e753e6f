//! Data models for Repair Desk storage.

use chrono::{DateTime, NaiveDate};
use serde::{Serialize, Serializer};

use crate::lifecycle::RequestStatus;
use crate::policy::Role;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub full_name: String,
    pub phone: String,
    pub login: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RepairRequest {
    pub request_id: i64,
    pub start_date: NaiveDate,
    pub tech_type: String,
    pub tech_model: String,
    pub problem_description: String,
    pub request_status: RequestStatus,
    pub completion_date: Option<NaiveDate>,
    pub repair_parts: Option<String>,
    pub master_id: Option<i64>,
    pub client_id: i64,
}

/// A request with the names of its technician and client.
///
/// Names are `None` when the referenced user no longer exists.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RequestView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub request: RepairRequest,
    pub master_name: Option<String>,
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub comment_id: i64,
    pub message: String,
    /// Author id. Any role may author a comment.
    pub master_id: i64,
    pub request_id: i64,
    #[serde(serialize_with = "rfc3339")]
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub comment: Comment,
    pub master_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct EquipmentCount {
    pub equipment_type: String,
    pub total_requests: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct WorkloadRow {
    pub master_id: i64,
    pub master_name: String,
    pub active_requests: i64,
    pub completed_requests: i64,
    pub total_requests: i64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn rfc3339<S: Serializer>(ts: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    match DateTime::from_timestamp(*ts, 0) {
        Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
        None => serializer.serialize_i64(*ts),
    }
}
