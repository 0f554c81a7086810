//! Core Error Types
//!
//! Errors raised by the shared model types: unknown labels read back from
//! storage or requests, and invalid configuration values. The application
//! crate maps both to its own `AppError`.

use thiserror::Error;

/// Core error type for the AssetWorks workspace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Parse errors (unknown enum labels, malformed identifiers)
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
