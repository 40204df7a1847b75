//! Error types for upstream provider calls.

use thiserror::Error;

/// Result type alias for provider operations.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Errors from a provider call. The kinds are internal bookkeeping; to
/// the fan-out every variant means the same thing — the batch fails.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Building the HTTP client failed.
    #[error("{provider}: client setup failed: {source}")]
    Setup {
        provider: &'static str,
        source: reqwest::Error,
    },

    /// Transport failure, including the per-call timeout.
    #[error("{provider}: request failed: {source}")]
    Request {
        provider: &'static str,
        source: reqwest::Error,
    },

    /// The provider answered outside the 2xx range.
    #[error("{provider}: unexpected status {status}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
    },

    /// The provider answered 2xx with a body we could not decode.
    #[error("{provider}: malformed response: {source}")]
    Malformed {
        provider: &'static str,
        source: reqwest::Error,
    },
}
