//! Shared vocabulary for the framespace renderer core.
//!
//! Declarative inputs reach the renderer as already-parsed JSON trees; this
//! crate holds the typed-value vocabulary (`DataKind`) and the defaulting
//! readers that turn `serde_json::Value` nodes into plain numeric data.

mod kinds;
pub mod value;

pub use kinds::DataKind;

/// Errors from declarative config parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown {field} name: {name:?}")]
    UnknownName { field: &'static str, name: String },
    #[error("field {field} expects {expected}")]
    BadShape {
        field: &'static str,
        expected: &'static str,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn crate_info() -> &'static str {
    "framespace-common v0.1.0"
}
