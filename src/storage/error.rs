//! Error types for the persistence layer.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Classification of relational-store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageDbErrorKind {
    /// `SQLite` reported busy/locked.
    BusyOrLocked,
    /// A NOT NULL, CHECK or other constraint failed.
    ConstraintViolation,
    PoolTimeout,
    PoolClosed,
    RowNotFound,
    Io,
    Protocol,
    Other,
}

impl StorageDbErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => Self::PoolTimeout,
            sqlx::Error::PoolClosed => Self::PoolClosed,
            sqlx::Error::RowNotFound => Self::RowNotFound,
            sqlx::Error::Io(_) => Self::Io,
            sqlx::Error::Protocol(_) => Self::Protocol,
            sqlx::Error::Database(db_error) => {
                let code = db_error.code();
                let message = db_error.message().to_ascii_lowercase();
                if matches!(code.as_deref(), Some("5" | "6" | "SQLITE_BUSY" | "SQLITE_LOCKED"))
                    || message.contains("database is locked")
                {
                    Self::BusyOrLocked
                } else if db_error.is_check_violation()
                    || db_error.is_unique_violation()
                    || code.as_deref().is_some_and(|c| c.starts_with("SQLITE_CONSTRAINT"))
                    || message.contains("constraint failed")
                {
                    Self::ConstraintViolation
                } else {
                    Self::Other
                }
            }
            _ => Self::Other,
        }
    }
}

impl fmt::Display for StorageDbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BusyOrLocked => "busy_or_locked",
            Self::ConstraintViolation => "constraint_violation",
            Self::PoolTimeout => "pool_timeout",
            Self::PoolClosed => "pool_closed",
            Self::RowNotFound => "row_not_found",
            Self::Io => "io",
            Self::Protocol => "protocol",
            Self::Other => "other",
        })
    }
}

/// Errors raised by snapshot writers and the tool store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A statement against the relational store failed.
    #[error("database error ({kind}): {message}")]
    Database {
        kind: StorageDbErrorKind,
        message: String,
    },

    /// Reading or writing a file failed.
    #[error("failed to access {}: {source}\n  Suggestion: Check that the data directory exists and is writable", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// CSV encoding failed.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: StorageDbErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl StorageError {
    /// Wraps an IO error with the path it concerns.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the database error kind, when this is a database error.
    #[must_use]
    pub fn database_kind(&self) -> Option<StorageDbErrorKind> {
        match self {
            Self::Database { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
