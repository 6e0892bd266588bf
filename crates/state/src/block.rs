//! Declarative render-state blocks.
//!
//! Materials and layers carry fixed state as a JSON object; a parsed block is
//! an ordered list of [`StateChange`]s fed through `StateStack::apply`.
//! Key and enum vocabulary:
//!
//! ```json
//! {
//!     "cullMode": "none",
//!     "depthCompare": "lessOrEqual",
//!     "depthWrite": false,
//!     "blend": ["add", "sourceAlpha", "invSourceAlpha"],
//!     "blendColour": [1.0, 1.0, 1.0, 0.5]
//! }
//! ```
//!
//! `blend` also accepts a plain bool (or 0/1) to toggle blending without
//! touching the function; `blendSource`/`blendDest` and `blendType` set the
//! function and equation individually.

use crate::stack::StateChange;
use framespace_common::ConfigError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A parsed, ordered set of state changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateBlock {
    changes: Vec<StateChange>,
}

impl StateBlock {
    /// Parse a block from a JSON object. Absent keys contribute nothing;
    /// unknown enum names and mis-shaped fields are errors.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let mut changes = Vec::new();

        if let Some(v) = value.get("cullMode") {
            changes.push(StateChange::CullMode(parse_enum("cullMode", v)?));
        }

        if let Some(v) = value.get("depthCompare") {
            changes.push(StateChange::DepthCompare(parse_enum("depthCompare", v)?));
        }

        if let Some(v) = value.get("depthWrite") {
            changes.push(StateChange::DepthWrite(parse_toggle("depthWrite", v)?));
        }

        if let Some(v) = value.get("blend") {
            if let Some(parts) = v.as_array() {
                // [type, source, dest] enables blending and sets both the
                // equation and the function.
                if parts.len() != 3 {
                    return Err(ConfigError::BadShape {
                        field: "blend",
                        expected: "bool or [type, source, dest]",
                    });
                }
                changes.push(StateChange::Blend(true));
                changes.push(StateChange::BlendEquation(parse_enum("blend", &parts[0])?));
                changes.push(StateChange::BlendFunc {
                    source: parse_enum("blend", &parts[1])?,
                    dest: parse_enum("blend", &parts[2])?,
                });
            } else {
                changes.push(StateChange::Blend(parse_toggle("blend", v)?));
            }
        }

        let source = value.get("blendSource");
        let dest = value.get("blendDest");
        if let (Some(s), Some(d)) = (source, dest) {
            changes.push(StateChange::BlendFunc {
                source: parse_enum("blendSource", s)?,
                dest: parse_enum("blendDest", d)?,
            });
        } else if source.is_some() || dest.is_some() {
            return Err(ConfigError::BadShape {
                field: "blendSource",
                expected: "both blendSource and blendDest",
            });
        }

        if let Some(v) = value.get("blendColour") {
            let parts = v.as_array().filter(|a| a.len() == 4).ok_or({
                ConfigError::BadShape {
                    field: "blendColour",
                    expected: "[r, g, b, a]",
                }
            })?;
            let mut colour = [0.0; 4];
            for (c, p) in colour.iter_mut().zip(parts) {
                *c = framespace_common::value::as_f32(p, 0.0);
            }
            changes.push(StateChange::BlendColour(colour));
        }

        if let Some(v) = value.get("blendType") {
            changes.push(StateChange::BlendEquation(parse_enum("blendType", v)?));
        }

        Ok(Self { changes })
    }

    /// The changes in declaration order.
    pub fn changes(&self) -> &[StateChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

fn parse_enum<T: DeserializeOwned>(field: &'static str, value: &Value) -> Result<T, ConfigError> {
    serde_json::from_value(value.clone()).map_err(|_| match value.as_str() {
        Some(name) => ConfigError::UnknownName {
            field,
            name: name.to_string(),
        },
        None => ConfigError::BadShape {
            field,
            expected: "a name string",
        },
    })
}

/// Bool fields also accept 0/1, as the declarative sources do.
fn parse_toggle(field: &'static str, value: &Value) -> Result<bool, ConfigError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_i64() != Some(0)),
        _ => Err(ConfigError::BadShape {
            field,
            expected: "bool or 0/1",
        }),
    }
}
