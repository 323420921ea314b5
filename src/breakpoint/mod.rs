//! Breakpoints with pass-count policies
//!
//! Pass-count filtering (`Equal`, `GreaterThanOrEqual`, `Mod`) is enforced
//! by the engine through its ignore count. This module keeps that ignore
//! count and the engine's enabled flag consistent with the user's settings.

pub mod binding;
pub mod break_on;
pub mod host;

pub use binding::BreakpointBinding;
pub use break_on::{engine_enabled, engine_ignore_count, BreakOn, BreakOnKind};
pub use host::{BindRequest, BindingUpdate, BoundLocation, BreakpointHost};
