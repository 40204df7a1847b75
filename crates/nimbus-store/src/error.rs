//! Error types for the query store.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database: {0}")]
    Open(sqlx::Error),

    #[error("schema setup failed: {0}")]
    Schema(sqlx::Error),

    #[error("query failed: {0}")]
    Query(sqlx::Error),
}
