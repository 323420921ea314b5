//! V8 debugger protocol implementation
//!
//! This module implements the client side of the protocol spoken by
//! `node --debug`: framing, the socket connection, and request/response
//! correlation.

pub mod client;
pub mod codec;
pub mod connection;
pub mod types;

pub use client::{DebuggerClient, PendingResponse};
pub use connection::{Connection, ConnectionEvent};
pub use types::*;
