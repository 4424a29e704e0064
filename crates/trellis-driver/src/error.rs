//! Error types for dispatch and response formatting

use crate::client::ClientError;
use thiserror::Error;
use trellis_core::CommandError;

/// Driver error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// Bag validation or compilation failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The driver lacks a capability
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// The raw payload does not have the requested shape
    #[error("Formatting error: {0}")]
    Formatting(String),

    /// Transaction protocol violation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The native client failed
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

impl DriverError {
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    pub fn formatting(msg: impl Into<String>) -> Self {
        Self::Formatting(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check for a missing capability, whether raised here or by a processor
    pub fn is_not_supported(&self) -> bool {
        match self {
            Self::NotSupported(_) => true,
            Self::Command(err) => err.is_not_supported(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_supported_sees_through_command_errors() {
        assert!(DriverError::not_supported("tree").is_not_supported());
        assert!(DriverError::from(CommandError::not_supported("edge")).is_not_supported());
        assert!(!DriverError::from(CommandError::validation("x")).is_not_supported());
        assert!(!DriverError::formatting("x").is_not_supported());
    }

    #[test]
    fn test_client_error_conversion() {
        let err: DriverError = ClientError::transport("connection reset").into();
        assert_eq!(
            err.to_string(),
            "Client error: Transport error: connection reset"
        );
    }
}
