//! Core error model.

use thiserror::Error;

/// Result type used by the identity primitives.
pub type CoreResult<T> = Result<T, CoreError>;

/// Identity-level error.
///
/// Kept deliberately small: every variant describes malformed caller input,
/// never an infrastructure failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A mandatory identifier was empty (or whitespace only).
    #[error("{0} must not be empty")]
    EmptyIdentifier(&'static str),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl CoreError {
    pub fn empty(field: &'static str) -> Self {
        Self::EmptyIdentifier(field)
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
