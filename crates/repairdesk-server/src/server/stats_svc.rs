//! Operational statistics.
//!
//! Every rollup is read-only and never fails: a storage error is logged and
//! the rollup falls back to zero or an empty list.

use std::fmt::Display;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::policy::Role;
use crate::storage::{EquipmentCount, RepairDatabase, WorkloadRow};

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_requests: i64,
    pub completed_requests: i64,
    pub avg_completion_days: f64,
    pub masters_count: i64,
    pub equipment_statistics: Vec<EquipmentCount>,
    pub master_workload: Vec<WorkloadRow>,
}

/// Mean of `completion - start` in days, rounded to two decimals; `0` when
/// there are no spans.
#[allow(clippy::cast_precision_loss)]
pub fn average_completion_days(spans: &[(NaiveDate, NaiveDate)]) -> f64 {
    if spans.is_empty() {
        return 0.0;
    }
    let total: i64 = spans
        .iter()
        .map(|(start, done)| (*done - *start).num_days())
        .sum();
    let mean = total as f64 / spans.len() as f64;
    (mean * 100.0).round() / 100.0
}

fn or_default<T: Default, E: Display>(rollup: &str, result: Result<T, E>) -> T {
    result.unwrap_or_else(|e| {
        warn!(rollup, error = %e, "Statistics rollup failed, using default");
        T::default()
    })
}

pub struct StatsService {
    db: RepairDatabase,
}

impl StatsService {
    pub const fn new(db: RepairDatabase) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(op = "statistics"))]
    pub async fn statistics(&self) -> Statistics {
        Statistics {
            total_requests: self.total_requests().await,
            completed_requests: self.completed_count().await,
            avg_completion_days: self.average_completion_days().await,
            masters_count: self.masters_count().await,
            equipment_statistics: self.by_equipment_type().await,
            master_workload: self.master_workload().await,
        }
    }

    pub async fn total_requests(&self) -> i64 {
        or_default("total_requests", self.db.count_requests().await)
    }

    pub async fn completed_count(&self) -> i64 {
        or_default("completed_requests", self.db.count_completed_requests().await)
    }

    pub async fn average_completion_days(&self) -> f64 {
        let spans = or_default("completion_spans", self.db.completion_spans().await);
        average_completion_days(&spans)
    }

    pub async fn masters_count(&self) -> i64 {
        or_default("masters_count", self.db.count_users_with_role(Role::Master).await)
    }

    pub async fn by_equipment_type(&self) -> Vec<EquipmentCount> {
        or_default("equipment_statistics", self.db.equipment_breakdown().await)
    }

    pub async fn master_workload(&self) -> Vec<WorkloadRow> {
        or_default("master_workload", self.db.master_workload().await)
    }
}
