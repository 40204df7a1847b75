//! Error types for the request coalescer.

use thiserror::Error;

/// Result type alias for coalescer operations.
pub type CoalesceResult<T> = Result<T, CoalesceError>;

/// Errors delivered to waiting tickets.
///
/// `Clone` because every ticket in a failed batch receives the same value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoalesceError {
    /// The upstream fan-out for the ticket's batch failed.
    #[error("upstream fetch failed: {0}")]
    Upstream(String),

    /// The batch task dropped the ticket without delivering a result.
    #[error("batch dropped before completion")]
    Dropped,
}
