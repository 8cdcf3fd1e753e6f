//! Repair request queries.

use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite};

use super::db::{DatabaseError, RepairDatabase};
use super::models::{RepairRequest, RequestView};
use crate::lifecycle::{Page, RequestDraft, RequestStatus, SearchTerm};
use crate::policy::RequestScope;

/// Requests joined with the names of their technician and client.
const VIEW_SELECT: &str = "SELECT r.*, m.full_name AS master_name, c.full_name AS client_name \
     FROM repair_requests r \
     LEFT JOIN users m ON m.user_id = r.master_id \
     LEFT JOIN users c ON c.user_id = r.client_id";

const UPDATE_REQUEST_SQL: &str = "UPDATE repair_requests SET tech_type = ?, tech_model = ?, \
     problem_description = ?, request_status = ?, completion_date = ?, repair_parts = ?, \
     master_id = ? WHERE request_id = ?";

/// Row filter for request listings.
#[derive(Debug, Clone)]
pub struct RequestFilter {
    pub scope: RequestScope,
    pub status: Option<RequestStatus>,
    pub search: Option<SearchTerm>,
}

/// Escape `%`, `_` and the escape char itself for a `LIKE ... ESCAPE '\'`.
fn like_pattern(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &RequestFilter) {
    qb.push(" WHERE 1 = 1");

    match filter.scope {
        RequestScope::All => {}
        RequestScope::OwnedBy(id) => {
            qb.push(" AND r.client_id = ").push_bind(id);
        }
        RequestScope::AssignedTo(id) => {
            qb.push(" AND r.master_id = ").push_bind(id);
        }
    }

    if let Some(status) = filter.status {
        qb.push(" AND r.request_status = ").push_bind(status);
    }

    match &filter.search {
        None => {}
        Some(SearchTerm::Id(id)) => {
            qb.push(" AND r.request_id = ").push_bind(*id);
        }
        Some(SearchTerm::Text(text)) => {
            let pattern = like_pattern(text);
            qb.push(" AND (r.tech_type LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR r.tech_model LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR r.problem_description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
    }
}

impl RepairDatabase {
    /// Insert a request in status `New` with no completion date.
    pub async fn create_request(
        &self,
        draft: &RequestDraft,
        start_date: NaiveDate,
    ) -> Result<RepairRequest, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO repair_requests \
             (start_date, tech_type, tech_model, problem_description, request_status, master_id, client_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(start_date)
        .bind(&draft.tech_type)
        .bind(&draft.tech_model)
        .bind(&draft.problem_description)
        .bind(RequestStatus::New)
        .bind(draft.master_id)
        .bind(draft.client_id)
        .execute(self.pool())
        .await?;

        self.get_request(result.last_insert_rowid()).await
    }

    /// Get a request by ID.
    pub async fn get_request(&self, id: i64) -> Result<RepairRequest, DatabaseError> {
        sqlx::query_as::<_, RepairRequest>("SELECT * FROM repair_requests WHERE request_id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Request {id}")))
    }

    /// Get a request by ID, with technician and client names.
    pub async fn get_request_view(&self, id: i64) -> Result<RequestView, DatabaseError> {
        let sql = format!("{VIEW_SELECT} WHERE r.request_id = ?");
        sqlx::query_as::<_, RequestView>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Request {id}")))
    }

    /// One page of requests matching `filter`, newest first, plus the total
    /// number of matching rows.
    pub async fn list_requests(
        &self,
        filter: &RequestFilter,
        page: Page,
    ) -> Result<(Vec<RequestView>, i64), DatabaseError> {
        let mut count: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM repair_requests r");
        push_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await?;

        let mut rows: QueryBuilder<'_, Sqlite> = QueryBuilder::new(VIEW_SELECT);
        push_filters(&mut rows, filter);
        rows.push(" ORDER BY r.start_date DESC, r.request_id DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = rows
            .build_query_as::<RequestView>()
            .fetch_all(self.pool())
            .await?;

        Ok((data, total))
    }

    /// Read, modify and write one request in a single transaction.
    ///
    /// `apply` runs against the current row; if it fails the transaction is
    /// dropped and the row is untouched. Returns the re-read row with names.
    ///
    /// The write lock is taken before the read, so a concurrent writer waits
    /// out the busy timeout and then applies on top of this one.
    pub async fn update_request_with<E, F>(&self, id: i64, apply: F) -> Result<RequestView, E>
    where
        E: From<DatabaseError>,
        F: FnOnce(&mut RepairRequest) -> Result<(), E>,
    {
        let mut tx = self
            .pool()
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(DatabaseError::from)?;

        let mut request = sqlx::query_as::<_, RepairRequest>(
            "SELECT * FROM repair_requests WHERE request_id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| DatabaseError::NotFound(format!("Request {id}")))?;

        apply(&mut request)?;

        sqlx::query(UPDATE_REQUEST_SQL)
            .bind(&request.tech_type)
            .bind(&request.tech_model)
            .bind(&request.problem_description)
            .bind(request.request_status)
            .bind(request.completion_date)
            .bind(&request.repair_parts)
            .bind(request.master_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;

        let sql = format!("{VIEW_SELECT} WHERE r.request_id = ?");
        let updated = sqlx::query_as::<_, RequestView>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;

        tx.commit().await.map_err(DatabaseError::from)?;

        Ok(updated)
    }

    /// Delete a request and its comments (transactionally).
    pub async fn delete_request(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM comments WHERE request_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM repair_requests WHERE request_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
