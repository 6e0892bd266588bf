//! Defaulting readers for declarative JSON values.
//!
//! Config values are forgiving: a missing or mis-shaped node yields the
//! caller's default rather than an error. Scalars accept both integer and
//! float JSON numbers; vectors accept arrays of numbers and fill missing
//! components from the default.

use serde_json::Value;

/// Read a float, falling back to `default`.
pub fn as_f32(value: &Value, default: f32) -> f32 {
    value.as_f64().map(|v| v as f32).unwrap_or(default)
}

/// Read a 2-vector from an array node, falling back per component.
pub fn as_vec2(value: &Value, default: [f32; 2]) -> [f32; 2] {
    read_array(value, default)
}

/// Read a 3-vector from an array node, falling back per component.
pub fn as_vec3(value: &Value, default: [f32; 3]) -> [f32; 3] {
    read_array(value, default)
}

/// Read a 4-vector from an array node, falling back per component.
pub fn as_vec4(value: &Value, default: [f32; 4]) -> [f32; 4] {
    read_array(value, default)
}

/// Read an RGBA colour; missing components default to opaque white.
pub fn as_rgba(value: &Value) -> [f32; 4] {
    read_array(value, [1.0; 4])
}

fn read_array<const N: usize>(value: &Value, default: [f32; N]) -> [f32; N] {
    let mut out = default;
    if let Some(elements) = value.as_array() {
        for (slot, element) in out.iter_mut().zip(elements) {
            if let Some(v) = element.as_f64() {
                *slot = v as f32;
            }
        }
    }
    out
}
