//! Per-breakpoint state machine
//!
//! A `BreakpointBinding` holds the user-facing settings of one breakpoint
//! and a mirror of what the engine currently has. Every edit that touches
//! the engine computes the new engine values first, sends them, and only
//! then commits the mirror; a rejected edit leaves the binding untouched.
//!
//! The logical hit count shown to users is `engine_hit_count -
//! hit_count_delta`, which lets the count be reset without touching the
//! engine's own monotonic counter.
//!
//! Bindings hold no locks. The owning session serializes all calls.

use crate::common::{Error, Result};

use super::break_on::{engine_enabled, engine_ignore_count, BreakOn, BreakOnKind};
use super::host::{BindRequest, BindingUpdate, BreakpointHost};

/// One breakpoint and its engine mirror
#[derive(Debug, Clone)]
pub struct BreakpointBinding {
    file_name: String,
    line: u32,
    column: u32,
    enabled: bool,
    break_on: BreakOn,
    condition: Option<String>,
    /// Engine id; 0 while unbound
    breakpoint_id: u32,
    engine_enabled: bool,
    engine_hit_count: u32,
    engine_ignore_count: u32,
    hit_count_delta: i64,
}

/// Mirror values after a reported hit, committed once any follow-up round
/// trip has come back
struct PostHit {
    engine_hit_count: u32,
    engine_ignore_count: u32,
}

impl BreakpointBinding {
    /// Unbound, enabled, always-breaking breakpoint at a 1-based line
    pub fn new(file_name: impl Into<String>, line: u32) -> Self {
        Self {
            file_name: file_name.into(),
            line,
            column: 1,
            enabled: true,
            break_on: BreakOn::ALWAYS,
            condition: None,
            breakpoint_id: 0,
            engine_enabled: false,
            engine_hit_count: 0,
            engine_ignore_count: 0,
            hit_count_delta: 0,
        }
    }

    pub fn with_column(mut self, column: u32) -> Self {
        self.column = column;
        self
    }

    pub fn with_break_on(mut self, break_on: BreakOn) -> Self {
        self.break_on = break_on;
        self
    }

    pub fn with_condition(mut self, condition: Option<String>) -> Self {
        self.condition = condition.filter(|c| !c.is_empty());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn break_on(&self) -> BreakOn {
        self.break_on
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Engine id, 0 while unbound
    pub fn breakpoint_id(&self) -> u32 {
        self.breakpoint_id
    }

    pub fn is_bound(&self) -> bool {
        self.breakpoint_id != 0
    }

    pub fn engine_enabled(&self) -> bool {
        self.engine_enabled
    }

    pub fn engine_hit_count(&self) -> u32 {
        self.engine_hit_count
    }

    pub fn engine_ignore_count(&self) -> u32 {
        self.engine_ignore_count
    }

    /// Logical (user-visible) hit count
    pub fn hit_count(&self) -> u32 {
        Self::logical(self.engine_hit_count, self.hit_count_delta)
    }

    fn logical(engine_hit_count: u32, delta: i64) -> u32 {
        (i64::from(engine_hit_count) - delta).clamp(0, i64::from(u32::MAX)) as u32
    }

    /// Location string for messages
    pub fn location(&self) -> String {
        format!("{}:{}", self.file_name, self.line)
    }

    /// Bind this breakpoint in the engine
    #[tracing::instrument(skip(self, host), fields(location = %self.location()))]
    pub async fn add<H: BreakpointHost + ?Sized>(&mut self, host: &H) -> Result<()> {
        if self.is_bound() {
            return Err(Error::InvalidArgument(format!(
                "breakpoint {} is already bound",
                self.breakpoint_id
            )));
        }

        let hit_count = self.hit_count();
        let engine_enabled = engine_enabled(self.enabled, self.break_on, hit_count);
        let engine_ignore_count = engine_ignore_count(self.break_on, hit_count);

        let request = BindRequest {
            file_name: self.file_name.clone(),
            line: self.line,
            column: self.column,
            enabled: engine_enabled,
            condition: self.condition.clone(),
            ignore_count: engine_ignore_count,
        };
        let bound = host.bind_breakpoint(&request).await?;
        if bound.breakpoint_id == 0 {
            return Err(Error::bind_failed(
                &self.location(),
                "engine returned breakpoint id 0",
            ));
        }

        // A fresh engine breakpoint starts counting at zero
        self.breakpoint_id = bound.breakpoint_id;
        self.line = bound.line;
        self.column = bound.column;
        self.engine_enabled = engine_enabled;
        self.engine_ignore_count = engine_ignore_count;
        self.engine_hit_count = 0;
        self.hit_count_delta = -i64::from(hit_count);

        tracing::debug!(id = self.breakpoint_id, line = self.line, "bound");
        Ok(())
    }

    /// Unbind this breakpoint
    ///
    /// The binding is considered removed even if the engine reports an
    /// error.
    pub async fn remove<H: BreakpointHost + ?Sized>(&mut self, host: &H) {
        if !self.is_bound() {
            return;
        }
        if let Err(e) = host.remove_breakpoint(self.breakpoint_id).await {
            tracing::warn!(id = self.breakpoint_id, error = %e, "engine failed to remove breakpoint");
        }
        self.breakpoint_id = 0;
    }

    /// Enable or disable the breakpoint
    pub async fn set_enabled<H: BreakpointHost + ?Sized>(&mut self, enabled: bool, host: &H) -> bool {
        if self.enabled == enabled {
            return true;
        }
        if !self.is_bound() {
            self.enabled = enabled;
            return true;
        }

        self.sync_counts(host).await;

        let engine_enabled = engine_enabled(enabled, self.break_on, self.hit_count());
        if engine_enabled != self.engine_enabled {
            let update = BindingUpdate {
                enabled: Some(engine_enabled),
                ..Default::default()
            };
            if !self.push(host, update).await {
                return false;
            }
            self.engine_enabled = engine_enabled;
        }

        self.enabled = enabled;
        true
    }

    /// Change the pass-count policy
    ///
    /// `force` re-sends the engine values even when the policy is unchanged.
    pub async fn set_break_on<H: BreakpointHost + ?Sized>(
        &mut self,
        break_on: BreakOn,
        force: bool,
        host: &H,
    ) -> bool {
        if !force && self.break_on == break_on {
            return true;
        }
        if !self.is_bound() {
            self.break_on = break_on;
            return true;
        }

        self.sync_counts(host).await;

        let hit_count = self.hit_count();
        let engine_enabled = engine_enabled(self.enabled, break_on, hit_count);
        let engine_ignore_count = engine_ignore_count(break_on, hit_count);

        let update = BindingUpdate {
            ignore_count: Some(engine_ignore_count),
            enabled: (engine_enabled != self.engine_enabled).then_some(engine_enabled),
            condition: None,
        };
        if !self.push(host, update).await {
            return false;
        }

        self.engine_enabled = engine_enabled;
        self.engine_ignore_count = engine_ignore_count;
        self.break_on = break_on;
        true
    }

    /// Set the logical hit count
    pub async fn set_hit_count<H: BreakpointHost + ?Sized>(&mut self, hit_count: u32, host: &H) -> bool {
        if !self.is_bound() {
            self.hit_count_delta = i64::from(self.engine_hit_count) - i64::from(hit_count);
            return true;
        }

        self.sync_counts(host).await;

        if self.break_on.kind != BreakOnKind::Always {
            let engine_enabled = engine_enabled(self.enabled, self.break_on, hit_count);
            let engine_ignore_count = engine_ignore_count(self.break_on, hit_count);

            let update = BindingUpdate {
                ignore_count: Some(engine_ignore_count),
                enabled: (engine_enabled != self.engine_enabled).then_some(engine_enabled),
                condition: None,
            };
            if !self.push(host, update).await {
                return false;
            }
            self.engine_enabled = engine_enabled;
            self.engine_ignore_count = engine_ignore_count;
        }

        self.hit_count_delta = i64::from(self.engine_hit_count) - i64::from(hit_count);
        true
    }

    /// Replace the condition; `None` or an empty string clears it
    pub async fn set_condition<H: BreakpointHost + ?Sized>(
        &mut self,
        condition: Option<String>,
        host: &H,
    ) -> bool {
        let condition = condition.filter(|c| !c.is_empty());
        if !self.is_bound() {
            self.condition = condition;
            return true;
        }

        let update = BindingUpdate {
            condition: Some(condition.clone().unwrap_or_default()),
            ..Default::default()
        };
        if !self.push(host, update).await {
            return false;
        }
        self.condition = condition;
        true
    }

    /// Account for a hit the engine reported
    ///
    /// `Always` and `GreaterThanOrEqual` need nothing from the engine.
    /// `Equal` has just seen its only qualifying hit and gets disabled;
    /// `Mod` gets its ignore count re-armed for the next period. For those
    /// two the mirror is committed only when the round trip returns, and
    /// the re-armed values only if it succeeded. Returns `false` when that
    /// round trip failed. The caller's follow-up work runs after this
    /// completes.
    pub async fn process_breakpoint_hit<H: BreakpointHost + ?Sized>(&mut self, host: &H) -> bool {
        if !self.is_bound() {
            return false;
        }

        let post = PostHit {
            engine_hit_count: self
                .engine_hit_count
                .saturating_add(self.engine_ignore_count)
                .saturating_add(1),
            engine_ignore_count: 0,
        };
        let hit_count = Self::logical(post.engine_hit_count, self.hit_count_delta);
        tracing::debug!(id = self.breakpoint_id, hit_count, break_on = %self.break_on, "hit");

        match self.break_on.kind {
            BreakOnKind::Always | BreakOnKind::GreaterThanOrEqual => {
                self.commit_hit(post);
                true
            }
            BreakOnKind::Equal => {
                let engine_enabled = engine_enabled(self.enabled, self.break_on, hit_count);
                if engine_enabled == self.engine_enabled {
                    self.commit_hit(post);
                    return true;
                }
                let update = BindingUpdate {
                    enabled: Some(engine_enabled),
                    ..Default::default()
                };
                let ok = self.push(host, update).await;
                self.commit_hit(post);
                if ok {
                    self.engine_enabled = engine_enabled;
                }
                ok
            }
            BreakOnKind::Mod => {
                let engine_ignore_count = engine_ignore_count(self.break_on, hit_count);
                let update = BindingUpdate {
                    ignore_count: Some(engine_ignore_count),
                    ..Default::default()
                };
                let ok = self.push(host, update).await;
                self.commit_hit(post);
                if ok {
                    self.engine_ignore_count = engine_ignore_count;
                }
                ok
            }
        }
    }

    /// Take back the most recent hit
    ///
    /// Only possible while the engine copy is enabled and still has ignore
    /// budget left; re-sends the pass-count values.
    pub async fn try_ignore<H: BreakpointHost + ?Sized>(&mut self, host: &H) -> bool {
        if !(self.engine_enabled && self.engine_ignore_count > 0) {
            return false;
        }

        self.hit_count_delta -= 1;
        if self.set_break_on(self.break_on, true, host).await {
            true
        } else {
            self.hit_count_delta += 1;
            false
        }
    }

    /// Pull the raw hit count from the engine
    ///
    /// Ignored hits are never reported, so while ignore budget is left the
    /// mirror may be behind the engine.
    pub async fn sync_counts<H: BreakpointHost + ?Sized>(&mut self, host: &H) {
        if self.engine_ignore_count == 0 || !self.is_bound() {
            return;
        }
        let Some(raw) = host.get_breakpoint_hit_count(self.breakpoint_id).await else {
            return;
        };
        if raw <= self.engine_hit_count {
            return;
        }

        let consumed = raw - self.engine_hit_count;
        self.engine_ignore_count = self.engine_ignore_count.saturating_sub(consumed);
        self.engine_hit_count = raw;
        tracing::trace!(
            id = self.breakpoint_id,
            raw,
            ignore = self.engine_ignore_count,
            "synced hit count"
        );
    }

    fn commit_hit(&mut self, post: PostHit) {
        self.engine_hit_count = post.engine_hit_count;
        self.engine_ignore_count = post.engine_ignore_count;
    }

    async fn push<H: BreakpointHost + ?Sized>(&self, host: &H, update: BindingUpdate) -> bool {
        let ok = host
            .update_breakpoint_binding(self.breakpoint_id, update, true)
            .await;
        if !ok {
            tracing::warn!(id = self.breakpoint_id, "engine rejected breakpoint update");
        }
        ok
    }
}
