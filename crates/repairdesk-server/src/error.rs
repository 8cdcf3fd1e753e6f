//! HTTP-facing error taxonomy.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use repairdesk_core::db::DatabaseError;
use serde::Serialize;
use tracing::{debug, error};

/// Input rejected before any state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Names of the offending fields.
    pub fields: Vec<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            fields: Vec::new(),
            message: message.into(),
        }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self {
            fields: vec![field.to_string()],
            message: message.into(),
        }
    }

    /// One error naming every missing field, in the order given.
    pub fn missing(fields: Vec<String>) -> Self {
        let message = format!("Missing required fields: {}", fields.join(", "));
        Self { fields, message }
    }
}

/// Errors returned by services and HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid login or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    /// Detail is logged where the failure happened, never sent to clients.
    #[error("Storage error")]
    Storage,

    #[error("Internal server error")]
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(what: &str, id: i64) -> Self {
        Self::NotFound(format!("{what} {id} not found"))
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            other => {
                error!(error = %other, "Storage operation failed");
                Self::Storage
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "Rejected JSON body");
        Self::Validation(ValidationError::new("Request body must be valid JSON"))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(ValidationError::new(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        Self::Validation(ValidationError::field("id", "Identifier must be an integer"))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [String]>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let fields = match &self {
            Self::Validation(v) if !v.fields.is_empty() => Some(v.fields.as_slice()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.to_string(),
            fields,
        };
        (self.status(), Json(body)).into_response()
    }
}
