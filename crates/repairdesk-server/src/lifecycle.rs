//! Request lifecycle: statuses, creation input, partial updates and listing
//! parameters.
//!
//! Everything here is pure. Storage calls [`apply_patch`] inside the update
//! transaction, so a rejected patch never reaches the database.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;
use crate::storage::RepairRequest;

/// Workflow stage of a repair request.
///
/// Any stage may follow any other; only membership in this set is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum RequestStatus {
    New,
    InRepair,
    AwaitingParts,
    ReadyForPickup,
    Completed,
}

impl RequestStatus {
    pub const ALL: [Self; 5] = [
        Self::New,
        Self::InRepair,
        Self::AwaitingParts,
        Self::ReadyForPickup,
        Self::Completed,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InRepair => "InRepair",
            Self::AwaitingParts => "AwaitingParts",
            Self::ReadyForPickup => "ReadyForPickup",
            Self::Completed => "Completed",
        }
    }

    /// Entering one of these stamps the completion date.
    pub const fn is_completing(self) -> bool {
        matches!(self, Self::ReadyForPickup | Self::Completed)
    }

    /// Counted as open work in technician workload.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::New | Self::InRepair | Self::AwaitingParts)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| {
                ValidationError::field("request_status", format!("Unknown request status '{s}'"))
            })
    }
}

/// Today's date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Body of a create call, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct NewRequest {
    pub tech_type: Option<String>,
    pub tech_model: Option<String>,
    pub problem_description: Option<String>,
    pub client_id: Option<i64>,
    pub master_id: Option<i64>,
}

/// A validated create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDraft {
    pub tech_type: String,
    pub tech_model: String,
    pub problem_description: String,
    pub client_id: i64,
    pub master_id: Option<i64>,
}

impl NewRequest {
    /// Trim text fields and check that every required field is present.
    pub fn validate(self) -> Result<RequestDraft, ValidationError> {
        let mut missing = Vec::new();

        let mut text = |name: &str, value: Option<String>| {
            let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
            if value.is_empty() {
                missing.push(name.to_string());
            }
            value
        };
        let tech_type = text("tech_type", self.tech_type);
        let tech_model = text("tech_model", self.tech_model);
        let problem_description = text("problem_description", self.problem_description);

        if self.client_id.is_none() {
            missing.push("client_id".to_string());
        }

        match self.client_id {
            Some(client_id) if missing.is_empty() => Ok(RequestDraft {
                tech_type,
                tech_model,
                problem_description,
                client_id,
                master_id: self.master_id,
            }),
            _ => Err(ValidationError::missing(missing)),
        }
    }
}

// ---------------------------------------------------------------------------
// Partial update
// ---------------------------------------------------------------------------

/// Body of an update call.
///
/// Outer `None`: the field was absent and stays untouched.
/// `Some(None)`: the field was an explicit `null`.
#[allow(clippy::option_option)]
#[derive(Debug, Default, Deserialize)]
pub struct RequestPatch {
    #[serde(default, deserialize_with = "explicit")]
    pub request_status: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub master_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "explicit")]
    pub repair_parts: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub problem_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub tech_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub tech_model: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub completion_date: Option<Option<String>>,
}

/// Present fields deserialize to `Some`, including `null`.
fn explicit<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A patch whose every field has been checked.
#[allow(clippy::option_option)]
struct CheckedPatch {
    status: Option<RequestStatus>,
    tech_type: Option<String>,
    tech_model: Option<String>,
    problem_description: Option<String>,
    master_id: Option<Option<i64>>,
    repair_parts: Option<Option<String>>,
    completion_date: Option<Option<NaiveDate>>,
}

impl RequestPatch {
    fn check(&self) -> Result<CheckedPatch, ValidationError> {
        let mut empty = Vec::new();
        let mut required = |name: &str, field: &Option<Option<String>>| match field {
            None => None,
            Some(value) => {
                let trimmed = value.as_deref().map(str::trim).unwrap_or_default();
                if trimmed.is_empty() {
                    empty.push(name.to_string());
                }
                Some(trimmed.to_string())
            }
        };

        let status = required("request_status", &self.request_status);
        let tech_type = required("tech_type", &self.tech_type);
        let tech_model = required("tech_model", &self.tech_model);
        let problem_description = required("problem_description", &self.problem_description);

        if !empty.is_empty() {
            let message = format!("Fields cannot be empty: {}", empty.join(", "));
            return Err(ValidationError {
                fields: empty,
                message,
            });
        }

        let status = status
            .as_deref()
            .map(str::parse::<RequestStatus>)
            .transpose()?;

        let completion_date = match &self.completion_date {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) if raw.trim().is_empty() => Some(None),
            Some(Some(raw)) => Some(Some(parse_date(raw.trim())?)),
        };

        let repair_parts = self
            .repair_parts
            .as_ref()
            .map(|v| v.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));

        Ok(CheckedPatch {
            status,
            tech_type,
            tech_model,
            problem_description,
            master_id: self.master_id,
            repair_parts,
            completion_date,
        })
    }
}

/// Accepts `YYYY-MM-DD`, a naive ISO datetime, or RFC 3339.
fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| {
            ValidationError::field("completion_date", format!("Invalid date '{raw}'"))
        })
}

/// Apply `patch` to `request`.
///
/// The whole patch is validated before anything is written, so on error
/// `request` is unchanged. A completing status stamps `today` only when no
/// completion date is set yet; an explicit `completion_date` in the same patch
/// is applied afterwards and wins.
pub fn apply_patch(
    request: &mut RepairRequest,
    patch: &RequestPatch,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    let checked = patch.check()?;

    if let Some(status) = checked.status {
        request.request_status = status;
        if status.is_completing() && request.completion_date.is_none() {
            request.completion_date = Some(today);
        }
    }
    if let Some(master_id) = checked.master_id {
        request.master_id = master_id;
    }
    if let Some(parts) = checked.repair_parts {
        request.repair_parts = parts;
    }
    if let Some(text) = checked.problem_description {
        request.problem_description = text;
    }
    if let Some(text) = checked.tech_type {
        request.tech_type = text;
    }
    if let Some(text) = checked.tech_model {
        request.tech_model = text;
    }
    if let Some(date) = checked.completion_date {
        request.completion_date = date;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Free-text search over requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    /// Numeric input matches the request id exactly.
    Id(i64),
    /// Case-insensitive substring of type, model or description.
    Text(String),
}

impl SearchTerm {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(raw.parse().map_or_else(|_| Self::Text(raw.to_string()), Self::Id))
    }
}

/// A resolved page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    /// Clamp caller input: page to at least 1, limit to `1..=max_limit`.
    pub fn resolve(page: Option<i64>, limit: Option<i64>, default_limit: u32, max_limit: u32) -> Self {
        let max_limit = max_limit.max(1);
        let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX));
        let limit = limit
            .unwrap_or_else(|| i64::from(default_limit))
            .clamp(1, i64::from(max_limit));
        Self {
            page: u32::try_from(page).unwrap_or(1),
            limit: u32::try_from(limit).unwrap_or(max_limit),
        }
    }

    pub fn offset(self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    /// Number of pages needed for `total` rows.
    pub fn pages(self, total: i64) -> i64 {
        let limit = i64::from(self.limit);
        (total.max(0) + limit - 1) / limit
    }
}
