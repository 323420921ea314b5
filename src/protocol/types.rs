//! V8 debugger protocol message types
//!
//! These types represent the JSON envelopes exchanged with a V8 debugger
//! agent (`node --debug`) and the subset of command payloads needed to
//! drive breakpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// === Base Protocol Messages ===

/// Request message sent to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMessage {
    pub seq: u64,
    #[serde(rename = "type")]
    pub message_type: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl RequestMessage {
    pub fn new(seq: u64, command: &str, arguments: Option<Value>) -> Self {
        Self {
            seq,
            message_type: "request".to_string(),
            command: command.to_string(),
            arguments,
        }
    }
}

/// Response message from the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub seq: u64,
    #[serde(rename = "type")]
    pub message_type: String,
    pub request_seq: u64,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running: Option<bool>,
}

/// Event message from the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub seq: u64,
    #[serde(rename = "type")]
    pub message_type: String,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running: Option<bool>,
}

// === Request Arguments ===

/// setbreakpoint request arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointArguments {
    /// Target kind: `script`, `scriptId`, `scriptRegExp` or `function`
    #[serde(rename = "type")]
    pub target_type: String,
    pub target: String,
    /// 0-based line
    pub line: u32,
    /// 0-based column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_count: Option<u32>,
}

/// changebreakpoint request arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeBreakpointArguments {
    pub breakpoint: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_count: Option<u32>,
}

/// clearbreakpoint request arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearBreakpointArguments {
    pub breakpoint: u32,
}

// === Response Bodies ===

/// Resolved position of a bound breakpoint (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualLocation {
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

/// setbreakpoint response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetBreakpointResponseBody {
    pub breakpoint: u32,
    #[serde(default)]
    pub actual_locations: Vec<ActualLocation>,
}

/// One entry of the listbreakpoints response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakpointInfo {
    pub number: u32,
    #[serde(default)]
    pub hit_count: u32,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default, rename = "ignoreCount")]
    pub ignore_count: Option<u32>,
    #[serde(default)]
    pub script_name: Option<String>,
}

/// listbreakpoints response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBreakpointsResponseBody {
    #[serde(default)]
    pub breakpoints: Vec<BreakpointInfo>,
    #[serde(default)]
    pub break_on_exceptions: bool,
    #[serde(default)]
    pub break_on_uncaught_exceptions: bool,
}

// === Events ===

/// Script reference carried by events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRef {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub line_offset: Option<u32>,
}

/// Body of a `break` event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEvent {
    /// Engine ids of the breakpoints that fired; empty for step/pause stops
    #[serde(default)]
    pub breakpoints: Vec<u32>,
    #[serde(default)]
    pub source_line: Option<u32>,
    #[serde(default)]
    pub source_column: Option<u32>,
    #[serde(default)]
    pub source_line_text: Option<String>,
    #[serde(default)]
    pub script: Option<ScriptRef>,
}

/// Body of an `exception` event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionEvent {
    #[serde(default)]
    pub uncaught: bool,
    #[serde(default)]
    pub exception: Option<Value>,
    #[serde(default)]
    pub source_line: Option<u32>,
    #[serde(default)]
    pub script: Option<ScriptRef>,
}

impl ExceptionEvent {
    /// Human-readable exception text, when the engine provided one
    pub fn text(&self) -> Option<&str> {
        self.exception.as_ref()?.get("text")?.as_str()
    }
}

/// Body of an `afterCompile` event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileScriptEvent {
    #[serde(default)]
    pub script: ScriptRef,
}

/// Typed event dispatched by the client
#[derive(Debug, Clone)]
pub enum DebuggerEvent {
    Break(BreakEvent),
    Exception(ExceptionEvent),
    AfterCompile(CompileScriptEvent),
    /// Event the client has no typed payload for
    Other { event: String, body: Option<Value> },
    /// Transport closed; always the last event
    Disconnected,
}

impl DebuggerEvent {
    /// Parse an event from an EventMessage
    ///
    /// Bodies that fail to parse fall back to `Other` so nothing is lost.
    pub fn from_message(msg: &EventMessage) -> Self {
        let body = msg.body.clone().unwrap_or(Value::Null);
        let typed = match msg.event.as_str() {
            "break" => serde_json::from_value(body).map(DebuggerEvent::Break).ok(),
            "exception" => serde_json::from_value(body)
                .map(DebuggerEvent::Exception)
                .ok(),
            "afterCompile" => serde_json::from_value(body)
                .map(DebuggerEvent::AfterCompile)
                .ok(),
            _ => None,
        };
        typed.unwrap_or_else(|| DebuggerEvent::Other {
            event: msg.event.clone(),
            body: msg.body.clone(),
        })
    }
}
