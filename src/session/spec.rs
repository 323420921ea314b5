//! Breakpoint specifications given on the command line
//!
//! Format: `FILE:LINE[@KIND:COUNT][?CONDITION]`, for example
//! `app.js:12`, `lib/worker.js:40@mod:10` or `app.js:7@eq:3?user.id == 4`.

use std::str::FromStr;

use crate::breakpoint::{BreakOn, BreakpointBinding};
use crate::common::Error;

/// A parsed breakpoint request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointSpec {
    pub file: String,
    /// 1-based line
    pub line: u32,
    pub break_on: BreakOn,
    pub condition: Option<String>,
}

impl BreakpointSpec {
    /// Parse a breakpoint specification
    pub fn parse(s: &str) -> Result<Self, Error> {
        let (rest, condition) = match s.split_once('?') {
            Some((rest, condition)) => (rest, Some(condition.trim().to_string())),
            None => (s, None),
        };
        let condition = condition.filter(|c| !c.is_empty());

        // Only treat '@' as the pass-count separator when what follows
        // parses; scoped package paths contain '@' too
        let (location, break_on) = match rest.rsplit_once('@') {
            Some((location, kind)) => match kind.parse::<BreakOn>() {
                Ok(break_on) => (location, break_on),
                Err(_) => (rest, BreakOn::ALWAYS),
            },
            None => (rest, BreakOn::ALWAYS),
        };

        let (file, line) = parse_location(location.trim())?;
        Ok(Self {
            file,
            line,
            break_on,
            condition,
        })
    }

    /// Unbound binding carrying these settings
    pub fn into_binding(self) -> BreakpointBinding {
        BreakpointBinding::new(self.file, self.line)
            .with_break_on(self.break_on)
            .with_condition(self.condition)
    }
}

impl FromStr for BreakpointSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split `file:line`, careful with Windows paths like `C:\app\main.js:10`
fn parse_location(s: &str) -> Result<(String, u32), Error> {
    let (file, line) = s
        .rsplit_once(':')
        .ok_or_else(|| Error::InvalidLocation(format!("expected FILE:LINE, got '{}'", s)))?;

    if file.is_empty() || line.is_empty() || !line.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidLocation(format!(
            "expected FILE:LINE, got '{}'",
            s
        )));
    }
    let line: u32 = line
        .parse()
        .map_err(|_| Error::InvalidLocation(format!("invalid line number: {}", line)))?;
    if line == 0 {
        return Err(Error::InvalidLocation("line numbers start at 1".to_string()));
    }

    Ok((file.to_string(), line))
}
