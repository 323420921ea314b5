//! Interface between a breakpoint binding and whoever talks to the engine

use async_trait::async_trait;

use crate::common::Result;

/// Everything the engine needs to create a breakpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    pub file_name: String,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
    pub enabled: bool,
    pub condition: Option<String>,
    pub ignore_count: u32,
}

/// Where the engine actually placed a breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundLocation {
    pub breakpoint_id: u32,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

/// Fields to change on an existing engine breakpoint; `None` leaves a
/// field as it is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingUpdate {
    pub ignore_count: Option<u32>,
    pub enabled: Option<bool>,
    /// An empty string clears the condition
    pub condition: Option<String>,
}

/// Engine-side operations a breakpoint binding relies on
///
/// Implemented by the session layer; breakpoint tests use a recording mock.
#[async_trait]
pub trait BreakpointHost: Send + Sync {
    /// Create the engine breakpoint
    async fn bind_breakpoint(&self, request: &BindRequest) -> Result<BoundLocation>;

    /// Delete the engine breakpoint
    async fn remove_breakpoint(&self, breakpoint_id: u32) -> Result<()>;

    /// Change an engine breakpoint
    ///
    /// With `validate_success` the result reflects the engine's answer;
    /// without it, only whether the request went out. Bindings always
    /// validate since they commit only confirmed state; the unvalidated
    /// form is for callers that do not care about the answer.
    async fn update_breakpoint_binding(
        &self,
        breakpoint_id: u32,
        update: BindingUpdate,
        validate_success: bool,
    ) -> bool;

    /// Raw, monotonic hit count the engine holds for a breakpoint
    async fn get_breakpoint_hit_count(&self, breakpoint_id: u32) -> Option<u32>;
}
