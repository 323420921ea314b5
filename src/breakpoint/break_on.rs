//! Pass-count policies and the engine reconciliation rules
//!
//! The engine only understands an enabled flag and an ignore count. These
//! functions translate a `BreakOn` policy plus the current logical hit count
//! into those two values. They are pure so that callers can decide whether
//! a round trip is needed before making one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::Error;

/// Which hits of a breakpoint actually stop execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakOnKind {
    /// Every hit
    #[default]
    Always,
    /// Only hit number `count`; disables itself afterwards
    Equal,
    /// Every hit from number `count` on
    GreaterThanOrEqual,
    /// Every `count`-th hit
    Mod,
}

/// Pass-count policy of a breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BreakOn {
    pub kind: BreakOnKind,
    pub count: u32,
}

impl BreakOn {
    pub const ALWAYS: BreakOn = BreakOn {
        kind: BreakOnKind::Always,
        count: 0,
    };

    pub const fn new(kind: BreakOnKind, count: u32) -> Self {
        Self { kind, count }
    }

    pub const fn equal(count: u32) -> Self {
        Self::new(BreakOnKind::Equal, count)
    }

    pub const fn greater_than_or_equal(count: u32) -> Self {
        Self::new(BreakOnKind::GreaterThanOrEqual, count)
    }

    pub const fn modulo(count: u32) -> Self {
        Self::new(BreakOnKind::Mod, count)
    }

    /// Whether hit number `hit_count` (1-based) stops execution
    pub fn should_break(&self, hit_count: u32) -> bool {
        match self.kind {
            BreakOnKind::Always => true,
            BreakOnKind::Equal => hit_count == self.count,
            BreakOnKind::GreaterThanOrEqual => hit_count >= self.count,
            BreakOnKind::Mod => self.count == 0 || hit_count % self.count == 0,
        }
    }
}

/// Enabled flag the engine should carry
///
/// An `Equal` breakpoint whose target hit has been reached must no longer
/// fire, so the engine copy is switched off even though the user still
/// sees it as enabled.
pub fn engine_enabled(enabled: bool, break_on: BreakOn, hit_count: u32) -> bool {
    if enabled && break_on.kind == BreakOnKind::Equal && hit_count >= break_on.count {
        return false;
    }
    enabled
}

/// Ignore count the engine should carry after `hit_count` hits
///
/// For `Mod(n)` the result is always in `[0, n - 1]`.
pub fn engine_ignore_count(break_on: BreakOn, hit_count: u32) -> u32 {
    match break_on.kind {
        BreakOnKind::Always => 0,
        BreakOnKind::Equal | BreakOnKind::GreaterThanOrEqual => {
            break_on.count.saturating_sub(hit_count).saturating_sub(1)
        }
        BreakOnKind::Mod => {
            if break_on.count == 0 {
                return 0;
            }
            break_on.count - (hit_count % break_on.count) - 1
        }
    }
}

impl fmt::Display for BreakOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            BreakOnKind::Always => write!(f, "always"),
            BreakOnKind::Equal => write!(f, "eq:{}", self.count),
            BreakOnKind::GreaterThanOrEqual => write!(f, "ge:{}", self.count),
            BreakOnKind::Mod => write!(f, "mod:{}", self.count),
        }
    }
}

impl FromStr for BreakOn {
    type Err = Error;

    /// Parses `always`, `eq:N`, `ge:N` or `mod:N`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("always") {
            return Ok(Self::ALWAYS);
        }

        let (kind, count) = s.split_once(':').ok_or_else(|| {
            Error::InvalidArgument(format!("pass count must look like kind:N, got '{}'", s))
        })?;
        let count: u32 = count
            .trim()
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("invalid pass count: {}", count)))?;
        if count == 0 {
            return Err(Error::InvalidArgument(
                "pass count must be at least 1".to_string(),
            ));
        }

        match kind.trim().to_ascii_lowercase().as_str() {
            "eq" | "equal" => Ok(Self::equal(count)),
            "ge" | "gte" => Ok(Self::greater_than_or_equal(count)),
            "mod" | "every" => Ok(Self::modulo(count)),
            other => Err(Error::InvalidArgument(format!(
                "unknown pass count kind: {}",
                other
            ))),
        }
    }
}
