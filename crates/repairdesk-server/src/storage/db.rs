//! Database connection and initialization.

pub use repairdesk_core::db::DatabaseError;

repairdesk_core::define_database!(RepairDatabase, "Repair database migrations complete");

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_works() {
        let db = RepairDatabase::open_in_memory().await;
        assert!(db.is_ok());
    }

    #[tokio::test]
    async fn open_on_disk_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("repairdesk.db");
        let db = RepairDatabase::open(&path).await.unwrap();
        assert!(path.exists());
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM repair_requests")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
