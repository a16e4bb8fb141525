//! SQLite connection and schema setup.
//!
//! The tool store has exactly one writer: the running binary, crawling
//! queries in order. Inserts rely on check-then-insert without a unique
//! constraint, so the pool is capped at [`SINGLE_WRITER`] connections and
//! every statement runs in submission order.
//!
//! # Example
//!
//! ```no_run
//! use vtools_core::Database;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("data/tools.db")).await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

/// Pool size. A second connection would let two check-then-insert
/// transactions interleave and store the same natural key twice.
pub const SINGLE_WRITER: u32 = 1;

/// How long a statement waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum DbError {
    #[error("failed to open tool store: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("failed to apply tool store schema: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Handle on the tool store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the store at `db_path`, creating the file on first use, and
    /// brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Connection`] when the file cannot be opened and
    /// [`DbError::Migration`] when the schema cannot be applied.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        Self::open(options).await
    }

    /// Opens a private in-memory store for tests.
    ///
    /// # Errors
    ///
    /// Same as [`Database::new`].
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        Self::open(SqliteConnectOptions::from_str("sqlite::memory:")?).await
    }

    async fn open(options: SqliteConnectOptions) -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(SINGLE_WRITER)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("tool store ready");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tools_table_exists_after_migration() {
        let db = Database::new_in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO tools (name, category, source, source_id) VALUES ('CBMC', 'functional_correctness', 'zenodo', '1')",
        )
        .execute(db.pool())
        .await;

        assert!(result.is_ok(), "tools table should exist after migration");
    }

    #[tokio::test]
    async fn test_created_at_defaults_to_now() {
        let db = Database::new_in_memory().await.unwrap();
        sqlx::query("INSERT INTO tools (name) VALUES ('Dafny')")
            .execute(db.pool())
            .await
            .unwrap();

        let (created_at,): (Option<String>,) =
            sqlx::query_as("SELECT created_at FROM tools LIMIT 1")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert!(created_at.is_some());
    }

    #[tokio::test]
    async fn test_natural_key_is_not_unique_constrained() {
        let db = Database::new_in_memory().await.unwrap();
        for _ in 0..2 {
            sqlx::query("INSERT INTO tools (name, source, source_id) VALUES ('KoAT', 'zenodo', '7')")
                .execute(db.pool())
                .await
                .unwrap();
        }
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tools")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_pool_is_capped_at_single_writer() {
        let db = Database::new_in_memory().await.unwrap();
        assert_eq!(db.pool().options().get_max_connections(), SINGLE_WRITER);
    }

    #[tokio::test]
    async fn test_file_store_uses_wal_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Database::new(&temp_dir.path().join("tools.db")).await.unwrap();

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        db.close().await;
    }

    #[tokio::test]
    async fn test_database_with_tempfile() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("tools.db");

        let db = Database::new(&db_path).await;
        assert!(db.is_ok(), "Failed to create database at temp path");
        assert!(db_path.exists());
        db.unwrap().close().await;
    }
}
