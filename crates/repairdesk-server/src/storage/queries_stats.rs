//! Read-only rollups over requests and technicians.

use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite};

use super::db::{DatabaseError, RepairDatabase};
use super::models::{EquipmentCount, WorkloadRow};
use crate::lifecycle::RequestStatus;
use crate::policy::Role;

/// `<column> IN (...)` over the statuses `keep` selects, bound as parameters.
fn push_status_in(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, keep: fn(RequestStatus) -> bool) {
    qb.push(column).push(" IN (");
    let mut list = qb.separated(", ");
    for status in RequestStatus::ALL.into_iter().filter(|s| keep(*s)) {
        list.push_bind(status);
    }
    qb.push(")");
}

impl RepairDatabase {
    pub async fn count_requests(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM repair_requests")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    /// Requests in a completing status (`ReadyForPickup` or `Completed`).
    pub async fn count_completed_requests(&self) -> Result<i64, DatabaseError> {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM repair_requests WHERE ");
        push_status_in(&mut qb, "request_status", RequestStatus::is_completing);
        let count = qb.build_query_scalar::<i64>().fetch_one(self.pool()).await?;
        Ok(count)
    }

    /// `(start_date, completion_date)` of every request with both set.
    pub async fn completion_spans(&self) -> Result<Vec<(NaiveDate, NaiveDate)>, DatabaseError> {
        let spans = sqlx::query_as::<_, (NaiveDate, NaiveDate)>(
            "SELECT start_date, completion_date FROM repair_requests \
             WHERE completion_date IS NOT NULL",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(spans)
    }

    /// Request counts per equipment type; blank types group as `Unspecified`.
    pub async fn equipment_breakdown(&self) -> Result<Vec<EquipmentCount>, DatabaseError> {
        let rows = sqlx::query_as::<_, EquipmentCount>(
            "SELECT COALESCE(NULLIF(TRIM(tech_type), ''), 'Unspecified') AS equipment_type, \
                    COUNT(*) AS total_requests \
             FROM repair_requests \
             GROUP BY equipment_type \
             ORDER BY total_requests DESC, equipment_type",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Active and completed request counts for every technician, including
    /// technicians with no requests.
    pub async fn master_workload(&self) -> Result<Vec<WorkloadRow>, DatabaseError> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT u.user_id AS master_id, u.full_name AS master_name, \
                    COALESCE(SUM(CASE WHEN ",
        );
        push_status_in(&mut qb, "r.request_status", RequestStatus::is_active);
        qb.push(" THEN 1 ELSE 0 END), 0) AS active_requests, COALESCE(SUM(CASE WHEN ");
        push_status_in(&mut qb, "r.request_status", RequestStatus::is_completing);
        qb.push(
            " THEN 1 ELSE 0 END), 0) AS completed_requests, \
             COUNT(r.request_id) AS total_requests \
             FROM users u \
             LEFT JOIN repair_requests r ON r.master_id = u.user_id \
             WHERE u.role = ",
        )
        .push_bind(Role::Master)
        .push(" GROUP BY u.user_id, u.full_name ORDER BY u.full_name, u.user_id");

        let rows = qb
            .build_query_as::<WorkloadRow>()
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }
}
