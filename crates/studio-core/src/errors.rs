//! Error types for the shared domain vocabulary.

use thiserror::Error;

/// Errors raised while parsing domain values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stored run status did not match any known variant.
    #[error("unknown run status: {0}")]
    UnknownStatus(String),

    /// A role string did not match any known variant.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// A message payload could not be decoded.
    #[error("invalid message payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Convenience type alias for core results.
pub type Result<T> = std::result::Result<T, CoreError>;
