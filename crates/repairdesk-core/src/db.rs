//! `SQLite` plumbing shared by Repair Desk crates.
//!
//! The server keeps users, repair requests and comments in one `SQLite` file.
//! This module owns how that file is opened, how `sqlx` failures are
//! classified, and the `define_database!` macro that gives the storage layer
//! its `RepairDatabase` handle.

use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::info;

/// How long a writer waits for a competing request update to commit.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connections for a file database. Writers still serialize on `SQLite`'s
/// single write lock; readers share the rest.
const FILE_POOL_SIZE: u32 = 5;

/// Storage failures as the HTTP layer needs to tell them apart.
///
/// `NotFound` becomes a 404, `Conflict` (a taken login) a validation error on
/// the offending field. Everything else is a 500 whose detail is only logged.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// The database directory could not be created.
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    /// A user, request or comment id that does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A `UNIQUE` constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_string())
            }
            _ => Self::Query(e.to_string()),
        }
    }
}

async fn connect(
    options: SqliteConnectOptions,
    max_connections: u32,
) -> Result<Pool<Sqlite>, DatabaseError> {
    let options = options
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Connection(e.to_string()))
}

/// Open (or create) the repair database at `path`.
///
/// Missing parent directories are created, so a fresh install can point at
/// `~/.repairdesk/repairdesk.db` directly. Foreign keys are enforced so
/// comments follow their request on delete. A request update that finds the
/// write lock held waits up to [`BUSY_TIMEOUT`] instead of failing.
pub async fn open_pool(path: &Path) -> Result<Pool<Sqlite>, DatabaseError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io(e.to_string()))?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;
    let pool = connect(options, FILE_POOL_SIZE).await?;

    info!(path = %path.display(), "Database opened");
    Ok(pool)
}

/// Open a throwaway in-memory database for tests.
///
/// Every `:memory:` connection is its own empty database, so the pool holds
/// exactly one connection; otherwise a seeded user could be invisible to the
/// next query.
pub async fn open_pool_in_memory() -> Result<Pool<Sqlite>, DatabaseError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;
    connect(options, 1).await
}

/// Seconds since the Unix epoch. Used for token `iat`/`exp` and comment
/// `created_at`.
#[allow(clippy::cast_possible_wrap)]
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Define a cloneable database handle over a pooled `SQLite` connection.
///
/// The handle runs the invoking crate's `./migrations` every time it is
/// opened, so a fresh file or in-memory database always has the current
/// schema before the first query. Query methods are added by the invoking
/// crate in its own `impl` blocks.
///
/// ```ignore
/// repairdesk_core::define_database!(RepairDatabase, "Repair database migrations complete");
/// ```
#[macro_export]
macro_rules! define_database {
    ($name:ident, $migration_msg:expr) => {
        #[derive(Clone)]
        pub struct $name {
            pool: ::sqlx::Pool<::sqlx::Sqlite>,
        }

        impl $name {
            /// Open the database file at `path`, creating and migrating it as needed.
            pub async fn open(
                path: &::std::path::Path,
            ) -> ::std::result::Result<Self, $crate::db::DatabaseError> {
                let pool = $crate::db::open_pool(path).await?;
                let db = Self { pool };
                db.run_migrations().await?;
                Ok(db)
            }

            /// A fresh, migrated in-memory database.
            pub async fn open_in_memory() -> ::std::result::Result<Self, $crate::db::DatabaseError>
            {
                let pool = $crate::db::open_pool_in_memory().await?;
                let db = Self { pool };
                db.run_migrations().await?;
                Ok(db)
            }

            async fn run_migrations(&self) -> ::std::result::Result<(), $crate::db::DatabaseError> {
                ::sqlx::migrate!("./migrations")
                    .run(&self.pool)
                    .await
                    .map_err(|e| $crate::db::DatabaseError::Migration(e.to_string()))?;

                ::tracing::info!($migration_msg);
                Ok(())
            }

            pub const fn pool(&self) -> &::sqlx::Pool<::sqlx::Sqlite> {
                &self.pool
            }
        }
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unix_timestamp_is_after_2024() {
        assert!(unix_timestamp() > 1_704_067_200);
    }

    #[tokio::test]
    async fn open_pool_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("repairdesk.db");

        let pool = open_pool(&path).await.unwrap();
        let row: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.unwrap();

        assert_eq!(row.0, 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn in_memory_pool_keeps_state_between_queries() {
        let pool = open_pool_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (id) VALUES (1)").execute(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn foreign_keys_cascade() {
        let pool = open_pool_in_memory().await.unwrap();
        for sql in [
            "CREATE TABLE parent (id INTEGER PRIMARY KEY)",
            "CREATE TABLE child (id INTEGER PRIMARY KEY, \
             parent_id INTEGER NOT NULL REFERENCES parent(id) ON DELETE CASCADE)",
            "INSERT INTO parent (id) VALUES (1)",
            "INSERT INTO child (id, parent_id) VALUES (1, 1)",
            "DELETE FROM parent WHERE id = 1",
        ] {
            sqlx::query(sql).execute(&pool).await.unwrap();
        }

        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM child")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(left, 0);
    }

    #[tokio::test]
    async fn unique_violation_is_conflict() {
        let pool = open_pool_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE u (login TEXT NOT NULL UNIQUE)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO u VALUES ('kasoo')").execute(&pool).await.unwrap();

        let err = sqlx::query("INSERT INTO u VALUES ('kasoo')")
            .execute(&pool)
            .await
            .map_err(DatabaseError::from)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }
}
