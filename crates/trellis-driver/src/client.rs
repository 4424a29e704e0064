//! The native client collaborator.
//!
//! Transport crates implement [`NativeClient`] over whatever wire protocol
//! their store speaks. The driver only hands it compiled commands and
//! transaction control calls.

use serde_json::Value;
use thiserror::Error;
use trellis_core::Command;

/// Errors reported by a native client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The server signalled that the command produced no result
    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// The server rejected the command
    #[error("Server error {code}: {message}")]
    Server { code: String, message: String },

    /// The connection failed
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn server(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Whether the error is the benign empty-result signal
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult(_))
    }
}

/// Executes compiled commands against a graph store.
pub trait NativeClient {
    /// Run `command`, returning the raw driver payload
    fn execute(&self, command: &Command) -> Result<Value, ClientError>;

    fn begin(&mut self) -> Result<(), ClientError>;

    fn commit(&mut self) -> Result<(), ClientError>;

    fn rollback(&mut self) -> Result<(), ClientError>;

    /// Release the connection. Default: nothing to release
    fn close(&mut self) -> Result<(), ClientError> {
        Ok(())
    }
}
