//! Frame Core: ties the state stack and shader data store into a per-frame
//! lifecycle.
//!
//! # Invariants
//! - Every frame starts from the same state baseline; recovery from a bad
//!   frame is "the next frame starts clean".
//! - Built-in derived transforms are consistent with their inputs at every
//!   point between `begin_frame` and the end of the frame.

mod builtins;
mod context;

pub use builtins::{BuiltinRefs, register_builtins};
pub use context::FrameContext;

pub fn crate_info() -> &'static str {
    "framespace-frame v0.1.0"
}
