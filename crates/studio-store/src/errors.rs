//! Error types for the persistence layer.
//!
//! [`StoreError`] is returned by every store operation. Migration failures,
//! including the reply backfill integrity gate, surface as
//! [`StoreError::Migration`].

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A stored value could not be mapped to a domain type.
    #[error("domain error: {0}")]
    Core(#[from] studio_core::CoreError),

    /// Filesystem error (creating the database directory).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// Requested run was not found.
    #[error("run not found: {0}")]
    RunNotFound(String),

    /// Requested reply was not found.
    #[error("reply not found: {0}")]
    ReplyNotFound(String),

    /// Invalid operation on the store.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
