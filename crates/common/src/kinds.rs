use serde::{Deserialize, Serialize};

/// The declared shape of a shader-data slot.
///
/// Slots store raw bytes; a declared kind pins the expected byte size so
/// mismatched reads and writes fail fast instead of reinterpreting garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    /// Same layout as `Vec4`; parses with an opaque-white default.
    Rgba,
    Mat3,
    Mat4,
}

impl DataKind {
    /// Byte size of a value of this kind, matching the column-array layouts
    /// the store uses (`[[f32; N]; N]` for matrices).
    pub fn byte_size(self) -> usize {
        match self {
            Self::Float => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 | Self::Rgba => 16,
            Self::Mat3 => 36,
            Self::Mat4 => 64,
        }
    }

    /// Parse a kind from its config name ("float", "vec2", ...).
    pub fn from_name(name: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(name.to_string())).ok()
    }
}
