//! Error types for the debugger client
//!
//! Connection and protocol failures surface through the transport, request
//! failures through the pending response, and rejected breakpoint edits
//! through the session layer.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the debugger client
#[derive(Error, Debug)]
pub enum Error {
    // === Connection Errors ===
    #[error("Failed to connect to debugger at {address}: {source}")]
    ConnectionFailed {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Connection closed by the debugger")]
    ConnectionClosed,

    #[error("Connection lost before a response to '{command}' arrived")]
    ConnectionLost { command: String },

    #[error("Not connected to a debugger")]
    NotConnected,

    // === Protocol Errors ===
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Request '{command}' failed: {message}")]
    RequestFailed { command: String, message: String },

    // === Breakpoint Errors ===
    #[error("Invalid breakpoint location: {0}")]
    InvalidLocation(String),

    #[error("Breakpoint {id} not found")]
    BreakpointNotFound { id: u32 },

    #[error("Failed to bind breakpoint at {location}: {reason}")]
    BindFailed { location: String, reason: String },

    #[error("Debugger rejected {action} for breakpoint {id}")]
    EditRejected { id: u32, action: String },

    // === Argument Errors ===
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // === Configuration Errors ===
    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a request failed error
    pub fn request_failed(command: &str, message: &str) -> Self {
        Self::RequestFailed {
            command: command.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an edit rejected error
    pub fn edit_rejected(id: u32, action: &str) -> Self {
        Self::EditRejected {
            id,
            action: action.to_string(),
        }
    }

    /// Create a bind failed error
    pub fn bind_failed(location: &str, reason: &str) -> Self {
        Self::BindFailed {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error means the transport is gone for good
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::ConnectionClosed
                | Self::ConnectionLost { .. }
                | Self::NotConnected
        )
    }
}
