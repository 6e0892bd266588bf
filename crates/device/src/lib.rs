//! Device Adapter: device-agnostic render sink.
//!
//! # Invariants
//! - The frame-state core never talks to a concrete graphics API; every
//!   device effect goes through the [`RenderDevice`] trait.
//! - State setters are fire-and-forget: per-frame calls do not fail.
//!   Resource creation is the only fallible surface.
//! - At most one buffer is mapped at a time; `map_range` must be paired with
//!   `unmap` before the next map.
//!
//! The trait is stable; swap in a native backend without changing consumers.
//! [`RecordingDevice`] is the in-process implementation the whole workspace
//! tests against.

mod device;
mod recording;

pub use device::{
    BlendEquation, BlendFactor, BlendState, BufferHandle, CompareFunc, CullMode, DeviceError,
    MapMode, RenderDevice,
};
pub use recording::{DeviceCall, RecordingDevice};

pub fn crate_info() -> &'static str {
    "framespace-device v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("device"));
    }
}
