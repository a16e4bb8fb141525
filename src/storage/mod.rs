//! Persistence of canonical tools.
//!
//! Three sinks share one data directory:
//!
//! ```text
//! <data_dir>/
//!   tools.db          relational store (append-only)
//!   json/tools_*.json full snapshots
//!   csv/tools_*.csv   full snapshots
//!   backup/backup_*.json
//! ```
//!
//! The relational store is written through [`ToolStore::insert_tools`], which
//! skips any tool whose natural key `(source, source_id)` is already present.
//! The check and the insert are two statements: with a single writer this is
//! idempotent, but two concurrent writers can both pass the check and insert
//! the same key twice. No UNIQUE constraint backs it.

mod error;
mod snapshot;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, instrument, warn};

pub use error::{StorageDbErrorKind, StorageError};
pub use snapshot::{
    CSV_DESCRIPTION_CHARS, CSV_HEADER, SNAPSHOT_TIMESTAMP_FORMAT, load_json_snapshot,
    snapshot_timestamp, write_csv_snapshot, write_json_snapshot,
};

use crate::db::Database;
use crate::tool::{CanonicalTool, Category};

/// Maximum number of rows copied into a backup archive.
pub const BACKUP_ROW_LIMIT: u32 = 10_000;

/// Default row limit for category queries.
pub const DEFAULT_QUERY_LIMIT: u32 = 100;

/// File name of the relational store inside the data directory.
pub const DB_FILE_NAME: &str = "tools.db";

/// Layout of the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDirs {
    root: PathBuf,
}

impl DataDirs {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn json_dir(&self) -> PathBuf {
        self.root.join("json")
    }

    #[must_use]
    pub fn csv_dir(&self) -> PathBuf {
        self.root.join("csv")
    }

    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.root.join("backup")
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.root.join(DB_FILE_NAME)
    }

    /// Creates the root and every sink directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if a directory cannot be created.
    pub fn ensure(&self) -> Result<(), StorageError> {
        for dir in [self.root.clone(), self.json_dir(), self.csv_dir(), self.backup_dir()] {
            if !dir.exists() {
                fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
                debug!(path = %dir.display(), "created data directory");
            }
        }
        Ok(())
    }
}

/// Counts reported by [`ToolStore::insert_tools`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertSummary {
    /// Rows newly written and committed.
    pub inserted: usize,
    /// Tools skipped because their natural key already existed.
    pub skipped: usize,
    /// Error that stopped the batch, if any.
    pub error: Option<String>,
}

/// Relational sink for canonical tools.
#[derive(Debug, Clone)]
pub struct ToolStore {
    db: Database,
}

impl ToolStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Inserts each tool whose natural key is not yet stored.
    ///
    /// Each tool is handled in its own transaction. Existing rows are never
    /// updated. When a statement fails, that tool's transaction is rolled
    /// back, the error is logged, and the counts committed so far are
    /// returned with the error text attached.
    ///
    /// The natural-key lookup and the insert are separate statements and the
    /// table has no unique constraint on `(source, source_id)`: two processes
    /// writing the same store concurrently can both insert the same key.
    #[instrument(skip(self, tools), fields(count = tools.len()))]
    pub async fn insert_tools(&self, tools: &[CanonicalTool]) -> InsertSummary {
        let mut summary = InsertSummary::default();

        for tool in tools {
            match self.insert_one(tool).await {
                Ok(true) => summary.inserted += 1,
                Ok(false) => {
                    debug!(source_id = tool.source_id(), "natural key exists, skipping");
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!(source_id = tool.source_id(), error = %e, "insert failed, batch stopped");
                    summary.error = Some(e.to_string());
                    break;
                }
            }
        }

        info!(inserted = summary.inserted, skipped = summary.skipped, "tools persisted");
        summary
    }

    async fn insert_one(&self, tool: &CanonicalTool) -> Result<bool, StorageError> {
        let data = serde_json::to_string(tool)?;
        let mut tx = self.db.pool().begin().await?;

        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM tools WHERE source = ? AND source_id = ? LIMIT 1")
                .bind(tool.source())
                .bind(tool.source_id())
                .fetch_optional(&mut *tx)
                .await?;

        if existing.is_some() {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO tools (name, category, description, source, source_id, doi, url, data) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(tool.name())
        .bind(tool.category().as_str())
        .bind(tool.description())
        .bind(tool.source())
        .bind(tool.source_id())
        .bind(tool.doi())
        .bind(tool.url())
        .bind(data)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Returns up to `limit` stored tools of one category, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the query fails or a stored row cannot be decoded.
    #[instrument(skip(self))]
    pub async fn query_by_category(
        &self,
        category: Category,
        limit: u32,
    ) -> Result<Vec<CanonicalTool>, StorageError> {
        let rows: Vec<(Option<String>,)> =
            sqlx::query_as("SELECT data FROM tools WHERE category = ? ORDER BY id LIMIT ?")
                .bind(category.as_str())
                .bind(i64::from(limit))
                .fetch_all(self.db.pool())
                .await?;
        decode_rows(rows)
    }

    /// Returns up to `limit` stored tools, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the query fails or a stored row cannot be decoded.
    #[instrument(skip(self))]
    pub async fn query_all(&self, limit: u32) -> Result<Vec<CanonicalTool>, StorageError> {
        let rows: Vec<(Option<String>,)> =
            sqlx::query_as("SELECT data FROM tools ORDER BY id LIMIT ?")
                .bind(i64::from(limit))
                .fetch_all(self.db.pool())
                .await?;
        decode_rows(rows)
    }

    /// Number of stored rows.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the query fails.
    pub async fn count(&self) -> Result<i64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tools")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Copies up to [`BACKUP_ROW_LIMIT`] stored tools into
    /// `<dir>/backup_<timestamp>.json` without touching the store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if reading the store or writing the file fails.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn backup(&self, dir: &Path) -> Result<PathBuf, StorageError> {
        let tools = self.query_all(BACKUP_ROW_LIMIT).await?;
        let path = dir.join(format!("backup_{}.json", snapshot_timestamp()));
        let content = serde_json::to_string_pretty(&tools)?;
        fs::write(&path, content).map_err(|e| StorageError::io(&path, e))?;

        info!(path = %path.display(), rows = tools.len(), "backup written");
        Ok(path)
    }
}

/// Decodes the `data` column of each row. Rows written without it (by hand
/// or by an older schema) carry no tool and are skipped with a warning.
fn decode_rows(rows: Vec<(Option<String>,)>) -> Result<Vec<CanonicalTool>, StorageError> {
    let total = rows.len();
    let tools = rows
        .into_iter()
        .filter_map(|(data,)| data)
        .map(|data| serde_json::from_str(&data).map_err(StorageError::from))
        .collect::<Result<Vec<CanonicalTool>, _>>()?;

    let skipped = total - tools.len();
    if skipped > 0 {
        warn!(skipped, "rows without serialized tool data skipped");
    }
    Ok(tools)
}
