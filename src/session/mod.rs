//! Debug session
//!
//! Owns the client, every breakpoint binding, and the event queue. Events
//! are drained one at a time by `next_event`, which is also the only place
//! breakpoint hits are processed, so bindings are never touched by two
//! operations at once.

mod engine_host;
mod spec;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::breakpoint::{BreakOn, BreakpointBinding};
use crate::common::{Error, Result};
use crate::protocol::{Connection, DebuggerClient, DebuggerEvent, ScriptRef};

pub use engine_host::EngineHost;
pub use spec::BreakpointSpec;

/// Debug session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Script is executing
    Running,
    /// Engine is paused (breakpoint, exception, step)
    Stopped,
    /// Connection is gone
    Exited,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Exited => write!(f, "exited"),
        }
    }
}

/// One breakpoint that fired, with its logical hit count after the hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointHit {
    pub id: u32,
    pub hit_count: u32,
}

/// What the session observed, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Stopped at one or more of our breakpoints
    BreakpointHit {
        hits: Vec<BreakpointHit>,
        script: Option<String>,
        line: Option<u32>,
    },
    /// Stopped for another reason (step, pause, `debugger;` statement)
    Paused {
        script: Option<String>,
        line: Option<u32>,
    },
    /// Stopped on a thrown exception
    Exception {
        uncaught: bool,
        text: Option<String>,
        script: Option<String>,
        line: Option<u32>,
    },
    /// A script was compiled
    ScriptCompiled { name: Option<String> },
    /// The connection closed
    Disconnected,
}

fn script_name(script: Option<ScriptRef>) -> Option<String> {
    script.and_then(|s| s.name)
}

/// Engine lines are 0-based
fn one_based(line: Option<u32>) -> Option<u32> {
    line.map(|l| l + 1)
}

/// Debug session over one connection
pub struct DebugSession {
    host: EngineHost,
    events_rx: mpsc::UnboundedReceiver<DebuggerEvent>,
    /// Bound breakpoints by engine id
    breakpoints: BTreeMap<u32, BreakpointBinding>,
    state: SessionState,
}

impl DebugSession {
    /// Connect to a debug port and start a session
    #[tracing::instrument]
    pub async fn attach(address: &str) -> Result<Self> {
        let connection = Arc::new(Connection::new());
        let client = DebuggerClient::new(Arc::clone(&connection))?;
        connection.connect(address).await?;
        tracing::info!("attached");
        Self::from_client(client)
    }

    /// Start a session on an existing client
    pub fn from_client(mut client: DebuggerClient) -> Result<Self> {
        let events_rx = client.take_event_receiver().ok_or_else(|| {
            Error::InvalidArgument("client events are already consumed".to_string())
        })?;

        Ok(Self {
            host: EngineHost::new(client),
            events_rx,
            breakpoints: BTreeMap::new(),
            state: SessionState::Running,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Engine version announced during the handshake
    pub fn node_version(&self) -> Option<semver::Version> {
        self.host.client().connection().node_version()
    }

    pub fn client(&self) -> &DebuggerClient {
        self.host.client()
    }

    /// Bind a breakpoint and take ownership of it
    pub async fn add_breakpoint(&mut self, mut binding: BreakpointBinding) -> Result<u32> {
        self.ensure_connected()?;
        binding.add(&self.host).await?;

        let id = binding.breakpoint_id();
        tracing::info!(
            id,
            location = %binding.location(),
            break_on = %binding.break_on(),
            "breakpoint bound"
        );
        self.breakpoints.insert(id, binding);
        Ok(id)
    }

    /// Unbind and forget a breakpoint
    pub async fn remove_breakpoint(&mut self, id: u32) -> Result<()> {
        let mut binding = self
            .breakpoints
            .remove(&id)
            .ok_or(Error::BreakpointNotFound { id })?;
        binding.remove(&self.host).await;
        Ok(())
    }

    pub async fn set_breakpoint_enabled(&mut self, id: u32, enabled: bool) -> Result<()> {
        let binding = self
            .breakpoints
            .get_mut(&id)
            .ok_or(Error::BreakpointNotFound { id })?;
        if binding.set_enabled(enabled, &self.host).await {
            Ok(())
        } else {
            Err(Error::edit_rejected(id, if enabled { "enable" } else { "disable" }))
        }
    }

    pub async fn set_breakpoint_break_on(&mut self, id: u32, break_on: BreakOn) -> Result<()> {
        let binding = self
            .breakpoints
            .get_mut(&id)
            .ok_or(Error::BreakpointNotFound { id })?;
        if binding.set_break_on(break_on, false, &self.host).await {
            Ok(())
        } else {
            Err(Error::edit_rejected(id, "pass count change"))
        }
    }

    pub async fn set_breakpoint_condition(
        &mut self,
        id: u32,
        condition: Option<String>,
    ) -> Result<()> {
        let binding = self
            .breakpoints
            .get_mut(&id)
            .ok_or(Error::BreakpointNotFound { id })?;
        if binding.set_condition(condition, &self.host).await {
            Ok(())
        } else {
            Err(Error::edit_rejected(id, "condition change"))
        }
    }

    pub async fn set_breakpoint_hit_count(&mut self, id: u32, hit_count: u32) -> Result<()> {
        let binding = self
            .breakpoints
            .get_mut(&id)
            .ok_or(Error::BreakpointNotFound { id })?;
        if binding.set_hit_count(hit_count, &self.host).await {
            Ok(())
        } else {
            Err(Error::edit_rejected(id, "hit count change"))
        }
    }

    /// Disregard the most recent hit of a breakpoint
    ///
    /// Only possible while the engine still has ignore budget for it, which
    /// in practice means a `mod` breakpoint that has just been re-armed.
    pub async fn ignore_breakpoint_hit(&mut self, id: u32) -> Result<()> {
        self.ensure_connected()?;
        let binding = self
            .breakpoints
            .get_mut(&id)
            .ok_or(Error::BreakpointNotFound { id })?;
        if binding.try_ignore(&self.host).await {
            Ok(())
        } else {
            Err(Error::edit_rejected(id, "ignoring the last hit"))
        }
    }

    pub fn breakpoint(&self, id: u32) -> Option<&BreakpointBinding> {
        self.breakpoints.get(&id)
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = &BreakpointBinding> {
        self.breakpoints.values()
    }

    /// Wait for the next event worth reporting
    ///
    /// Breakpoint hits are reconciled with the engine before they are
    /// returned. Returns `Disconnected` once the connection is gone.
    pub async fn next_event(&mut self) -> SessionEvent {
        loop {
            let Some(event) = self.events_rx.recv().await else {
                self.state = SessionState::Exited;
                return SessionEvent::Disconnected;
            };

            match event {
                DebuggerEvent::Break(body) => {
                    self.state = SessionState::Stopped;
                    let script = script_name(body.script);
                    let line = one_based(body.source_line);

                    if body.breakpoints.is_empty() {
                        return SessionEvent::Paused { script, line };
                    }

                    let mut hits = Vec::new();
                    for id in body.breakpoints {
                        let Some(binding) = self.breakpoints.get_mut(&id) else {
                            tracing::debug!(id, "hit on a breakpoint this session does not own");
                            continue;
                        };
                        if !binding.process_breakpoint_hit(&self.host).await {
                            tracing::warn!(id, "could not re-arm breakpoint after hit");
                        }
                        hits.push(BreakpointHit {
                            id,
                            hit_count: binding.hit_count(),
                        });
                    }

                    if hits.is_empty() {
                        return SessionEvent::Paused { script, line };
                    }
                    return SessionEvent::BreakpointHit { hits, script, line };
                }
                DebuggerEvent::Exception(body) => {
                    self.state = SessionState::Stopped;
                    let text = body.text().map(str::to_string);
                    return SessionEvent::Exception {
                        uncaught: body.uncaught,
                        text,
                        script: script_name(body.script),
                        line: one_based(body.source_line),
                    };
                }
                DebuggerEvent::AfterCompile(body) => {
                    return SessionEvent::ScriptCompiled {
                        name: body.script.name,
                    };
                }
                DebuggerEvent::Other { event, .. } => {
                    tracing::debug!(event = %event, "ignoring event");
                }
                DebuggerEvent::Disconnected => {
                    self.state = SessionState::Exited;
                    return SessionEvent::Disconnected;
                }
            }
        }
    }

    /// Resume execution
    pub async fn continue_execution(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.host.client().continue_execution().await?;
        self.state = SessionState::Running;
        Ok(())
    }

    /// Tell the engine we are leaving and close the connection
    pub async fn disconnect(&mut self) {
        if self.state != SessionState::Exited {
            // The agent may drop the socket before answering
            let _ = self.host.client().send_request("disconnect", None).await;
        }
        self.host.client().close().await;
        self.state = SessionState::Exited;
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.state == SessionState::Exited || !self.host.client().connection().is_connected() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }
}
