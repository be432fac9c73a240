//! Error types for the memoization engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Memo Error Enum ==
/// Unified error type for the memoization engine.
#[derive(Error, Debug)]
pub enum MemoError {
    /// The call shape could not be decomposed into region, method and arguments
    #[error("Invalid call descriptor: {0}")]
    Descriptor(String),

    /// An argument or result could not be stringified or cloned
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A value is stored under the key but with a different result type
    #[error("Cached value for key {0} has a different type")]
    TypeMismatch(String),

    /// The caller-supplied computation failed
    #[error(transparent)]
    Compute(anyhow::Error),
}

impl From<serde_json::Error> for MemoError {
    fn from(err: serde_json::Error) -> Self {
        MemoError::Serialization(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the memoization engine.
pub type Result<T> = std::result::Result<T, MemoError>;
