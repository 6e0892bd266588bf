//! Quad Streaming: per-frame procedural geometry without pipeline stalls.
//!
//! # Invariants
//! - A mesh's write cursor plus a reservation never exceeds capacity; the
//!   cursors wrap to zero (a fresh buffer generation) first.
//! - Every `request` is paired with exactly one `commit`, even for zero
//!   quads; each non-empty commit issues exactly one draw.
//! - Draws never batch across a wrap boundary.

mod layout;
mod mesh;

pub use layout::{VertexAttr, VertexLayout};
pub use mesh::{QuadMesh, StreamStats, StreamStrategy, WriteRegion};

pub fn crate_info() -> &'static str {
    "framespace-quadstream v0.1.0"
}
