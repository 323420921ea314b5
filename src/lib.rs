//! nodedebug - client for the V8/Node.js debugger protocol
//!
//! This library speaks the `Content-Length` framed JSON protocol of
//! `node --debug` and keeps user-level breakpoint policies (enabled flag,
//! pass counts, hit counts, conditions) in sync with the engine.

pub mod breakpoint;
pub mod cli;
pub mod commands;
pub mod common;
pub mod protocol;
pub mod session;

// Re-export commonly used types for tests
pub use breakpoint::{BreakOn, BreakOnKind, BreakpointBinding, BreakpointHost};
pub use common::{Error, Result};
pub use protocol::{Connection, DebuggerClient, DebuggerEvent};
pub use session::{BreakpointSpec, DebugSession, SessionEvent};
