//! Comments attached to repair requests.

use repairdesk_core::db::DatabaseError;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::auth::Principal;
use crate::error::{ApiError, ApiResult, ValidationError};
use crate::policy::{Action, authorize};
use crate::storage::{CommentView, RepairDatabase};

/// Body of a create-comment call.
///
/// `request_id` may arrive as a number or a numeric string.
#[derive(Debug, Default, Deserialize)]
pub struct NewComment {
    pub message: Option<String>,
    pub request_id: Option<Value>,
}

impl NewComment {
    fn validate(self) -> Result<(i64, String), ValidationError> {
        let message = self.message.unwrap_or_default();
        if message.trim().is_empty() {
            return Err(ValidationError::field("message", "Comment text is required"));
        }

        let request_id = match self.request_id {
            None | Some(Value::Null) => {
                return Err(ValidationError::field("request_id", "request_id is required"));
            }
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            Some(_) => None,
        }
        .ok_or_else(|| ValidationError::field("request_id", "request_id must be an integer"))?;

        Ok((request_id, message))
    }
}

/// Parse the mandatory `request_id` query parameter of a list call.
pub fn parse_request_id(raw: Option<&str>) -> Result<i64, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Err(ValidationError::field(
            "request_id",
            "request_id parameter is required",
        )),
        Some(s) => s.parse().map_err(|_| {
            ValidationError::field("request_id", "request_id must be an integer")
        }),
    }
}

pub struct CommentService {
    db: RepairDatabase,
}

impl CommentService {
    pub const fn new(db: RepairDatabase) -> Self {
        Self { db }
    }

    /// Comments on a request, newest first.
    #[instrument(skip(self), fields(op = "list_comments", caller = principal.user_id))]
    pub async fn list(&self, principal: &Principal, request_id: i64) -> ApiResult<Vec<CommentView>> {
        Ok(self.db.list_comments(request_id).await?)
    }

    /// Add a comment authored by `principal`.
    #[instrument(skip(self, input), fields(op = "create_comment", caller = principal.user_id))]
    pub async fn create(&self, principal: &Principal, input: NewComment) -> ApiResult<CommentView> {
        authorize(principal, Action::CreateComment)?;
        let (request_id, message) = input.validate()?;

        let comment = self
            .db
            .create_comment(request_id, principal.user_id, &message)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => ApiError::Validation(ValidationError::field(
                    "request_id",
                    format!("Request {request_id} does not exist"),
                )),
                other => other.into(),
            })?;

        info!(
            comment_id = comment.comment.comment_id,
            request_id, "Comment added"
        );
        Ok(comment)
    }

    /// Delete a comment. Only its author or a manager may do so.
    #[instrument(skip(self), fields(op = "delete_comment", caller = principal.user_id))]
    pub async fn delete(&self, principal: &Principal, comment_id: i64) -> ApiResult<()> {
        let comment = self.db.get_comment(comment_id).await?;
        authorize(
            principal,
            Action::DeleteComment {
                author_id: comment.master_id,
            },
        )?;

        if !self.db.delete_comment(comment_id).await? {
            return Err(ApiError::not_found("Comment", comment_id));
        }
        info!(comment_id, "Comment deleted");
        Ok(())
    }
}
