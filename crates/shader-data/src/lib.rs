//! Shader Data Store: named per-frame values with one-hop dependency updates.
//!
//! # Invariants
//! - A slot's dependents are notified exactly once per direct set; the
//!   fan-out is one hop, never transitive.
//! - Arena storage for a slot is reallocated only when its size changes.
//! - A derived slot is consistent with its declared inputs immediately after
//!   any of them is set.

pub mod config;
pub mod store;

pub use config::{ConfigFn, config_for_kind};
pub use store::{ShaderDataStore, SlotRef};

pub fn crate_info() -> &'static str {
    "framespace-shader-data v0.1.0"
}
