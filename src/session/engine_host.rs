//! `BreakpointHost` backed by a live debugger client

use async_trait::async_trait;

use crate::breakpoint::{BindRequest, BindingUpdate, BoundLocation, BreakpointHost};
use crate::common::{Error, Result};
use crate::protocol::{ChangeBreakpointArguments, DebuggerClient, SetBreakpointArguments};

/// Translates breakpoint operations into V8 commands
///
/// Lines and columns are 1-based on this side and 0-based on the wire.
pub struct EngineHost {
    client: DebuggerClient,
}

impl EngineHost {
    pub fn new(client: DebuggerClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DebuggerClient {
        &self.client
    }
}

#[async_trait]
impl BreakpointHost for EngineHost {
    async fn bind_breakpoint(&self, request: &BindRequest) -> Result<BoundLocation> {
        let args = SetBreakpointArguments {
            target_type: "script".to_string(),
            target: request.file_name.clone(),
            line: request.line.saturating_sub(1),
            column: Some(request.column.saturating_sub(1)),
            enabled: request.enabled,
            condition: request.condition.clone(),
            ignore_count: (request.ignore_count > 0).then_some(request.ignore_count),
        };

        let body = self.client.set_breakpoint(&args).await.map_err(|e| match e {
            Error::RequestFailed { message, .. } => Error::bind_failed(
                &format!("{}:{}", request.file_name, request.line),
                &message,
            ),
            other => other,
        })?;

        // Scripts not loaded yet have no actual location; keep the request's
        let actual = body.actual_locations.first();
        Ok(BoundLocation {
            breakpoint_id: body.breakpoint,
            line: actual.map_or(request.line, |l| l.line + 1),
            column: actual.map_or(request.column, |l| l.column + 1),
        })
    }

    async fn remove_breakpoint(&self, breakpoint_id: u32) -> Result<()> {
        self.client.clear_breakpoint(breakpoint_id).await
    }

    async fn update_breakpoint_binding(
        &self,
        breakpoint_id: u32,
        update: BindingUpdate,
        validate_success: bool,
    ) -> bool {
        let args = ChangeBreakpointArguments {
            breakpoint: breakpoint_id,
            enabled: update.enabled,
            condition: update.condition,
            ignore_count: update.ignore_count,
        };

        let pending = match self.client.change_breakpoint(&args).await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(breakpoint_id, error = %e, "changebreakpoint not sent");
                return false;
            }
        };
        if !validate_success {
            return true;
        }

        match pending.response().await {
            Ok(response) if response.success => true,
            Ok(response) => {
                tracing::warn!(
                    breakpoint_id,
                    message = response.message.as_deref().unwrap_or("unknown error"),
                    "changebreakpoint failed"
                );
                false
            }
            Err(e) => {
                tracing::warn!(breakpoint_id, error = %e, "changebreakpoint failed");
                false
            }
        }
    }

    async fn get_breakpoint_hit_count(&self, breakpoint_id: u32) -> Option<u32> {
        match self.client.list_breakpoints().await {
            Ok(body) => body
                .breakpoints
                .iter()
                .find(|bp| bp.number == breakpoint_id)
                .map(|bp| bp.hit_count),
            Err(e) => {
                tracing::warn!(breakpoint_id, error = %e, "listbreakpoints failed");
                None
            }
        }
    }
}
