//! # Database Error Types
//!
//! Error types for store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├──► Reconciler: log + skip event (ingestion loop keeps going)   │
//! │       ├──► Sync scheduler: log + retry next cycle                      │
//! │       └──► HTTP API: structured JSON error response                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// The store is unreachable: the pool is closed, exhausted, or the
    /// underlying file cannot be accessed. Callers log and skip the
    /// current operation rather than crash the ingestion loop.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Database connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Internal database error.
    #[error("internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// True when the failure is store-unavailability rather than a bad
    /// query; callers use this to decide between skip-and-continue and
    /// surfacing a bug.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DbError::Unavailable(_) | DbError::ConnectionFailed(_))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::PoolTimedOut  → DbError::Unavailable
/// sqlx::Error::PoolClosed    → DbError::Unavailable
/// sqlx::Error::Io            → DbError::Unavailable
/// sqlx::Error::Database      → DbError::QueryFailed
/// Other                      → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => {
                DbError::Unavailable("connection pool exhausted".to_string())
            }
            sqlx::Error::PoolClosed => DbError::Unavailable("pool is closed".to_string()),
            sqlx::Error::Io(e) => DbError::Unavailable(e.to_string()),
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
