//! Error types for bag validation and command processing

use thiserror::Error;

/// Errors raised while validating a [`Bag`](crate::Bag) or compiling it into a
/// [`Command`](crate::Command).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The bag is structurally inconsistent
    #[error("Validation error: {0}")]
    Validation(String),

    /// The dialect cannot express the requested operation
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// A processor broke its own contract
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for command operations
pub type CommandResult<T> = Result<T, CommandError>;

impl CommandError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not-supported error
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if the error reports a missing dialect capability
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported(_))
    }
}
