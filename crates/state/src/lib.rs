//! Render State Stack: scoped device-state changes with exact restore.
//!
//! # Invariants
//! - A channel's stamp never exceeds the current scope depth.
//! - Saved-log entries are consumed in exact reverse-nesting order; replaying
//!   a scope's slice restores every channel touched inside it.
//! - At most one log entry per channel per scope, however many times the
//!   channel changes inside that scope.

pub mod block;
pub mod stack;

pub use block::StateBlock;
pub use stack::{StateChange, StateStack};

pub fn crate_info() -> &'static str {
    "framespace-state v0.1.0"
}
