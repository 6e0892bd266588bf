//! Declarative config entry points for shader data.
//!
//! Content-driven slots arrive as JSON: a definition object declares a tag's
//! type (and optionally an initial value), and later objects set values by
//! tag. Config functions are plain parsers from a JSON node to slot bytes.

use crate::store::{ShaderDataStore, SlotRef};
use framespace_common::{ConfigError, DataKind, value};
use serde_json::Value;

/// Parser from a declarative value to a slot's bytes.
pub type ConfigFn = fn(&mut ShaderDataStore, SlotRef, &Value);

pub fn config_float(store: &mut ShaderDataStore, slot: SlotRef, v: &Value) {
    store.set_value(slot, value::as_f32(v, 0.0));
}

pub fn config_vec2(store: &mut ShaderDataStore, slot: SlotRef, v: &Value) {
    store.set_value(slot, value::as_vec2(v, [0.0; 2]));
}

pub fn config_vec3(store: &mut ShaderDataStore, slot: SlotRef, v: &Value) {
    store.set_value(slot, value::as_vec3(v, [0.0; 3]));
}

pub fn config_vec4(store: &mut ShaderDataStore, slot: SlotRef, v: &Value) {
    store.set_value(slot, value::as_vec4(v, [0.0; 4]));
}

pub fn config_rgba(store: &mut ShaderDataStore, slot: SlotRef, v: &Value) {
    store.set_value(slot, value::as_rgba(v));
}

/// The config parser for a declared kind. Matrix kinds are runtime-computed
/// only and have no declarative form.
pub fn config_for_kind(kind: DataKind) -> Option<ConfigFn> {
    match kind {
        DataKind::Float => Some(config_float),
        DataKind::Vec2 => Some(config_vec2),
        DataKind::Vec3 => Some(config_vec3),
        DataKind::Vec4 => Some(config_vec4),
        DataKind::Rgba => Some(config_rgba),
        DataKind::Mat3 | DataKind::Mat4 => None,
    }
}

impl ShaderDataStore {
    /// Walk a definition object of `{ tag: { "type": ..., "value": ... } }`
    /// entries: register each tag, declare its kind, install the matching
    /// config function, and apply the initial value when present.
    ///
    /// Every entry's tag is registered; entries with no type declaration get
    /// a bare slot and nothing else. An unknown type name is an error.
    pub fn load_slots(&mut self, config: &Value) -> Result<(), ConfigError> {
        let Some(entries) = config.as_object() else {
            return Ok(());
        };
        for (tag, info) in entries {
            let slot = self.add_slot(tag);
            let Some(type_name) = info.get("type").and_then(Value::as_str) else {
                continue;
            };
            let kind = DataKind::from_name(type_name).ok_or_else(|| ConfigError::UnknownName {
                field: "type",
                name: type_name.to_string(),
            })?;
            let Some(config_fn) = config_for_kind(kind) else {
                continue;
            };
            self.set_kind(slot, kind);
            self.register_config(slot, config_fn);
            if let Some(initial) = info.get("value") {
                if !initial.is_null() {
                    config_fn(self, slot, initial);
                }
            }
        }
        Ok(())
    }

    /// Apply a `{ tag: value }` object through registered config functions.
    /// Unknown tags and slots without a config function are skipped.
    pub fn set_from_object(&mut self, values: &Value) {
        let Some(entries) = values.as_object() else {
            return;
        };
        for (tag, v) in entries {
            if let Some(slot) = self.ref_from_tag(tag) {
                self.set_from_config(slot, v);
            }
        }
    }
}
