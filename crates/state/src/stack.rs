use framespace_device::{
    BlendEquation, BlendFactor, BlendState, CompareFunc, CullMode, RenderDevice,
};

/// A single change to one device-state channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateChange {
    CullMode(CullMode),
    DepthCompare(CompareFunc),
    DepthWrite(bool),
    Blend(bool),
    BlendFunc {
        source: BlendFactor,
        dest: BlendFactor,
    },
    BlendColour([f32; 4]),
    BlendEquation(BlendEquation),
}

/// A saved-log entry: the prior value of a channel plus the stamp it
/// carried, recorded on the first in-scope change. Restoring replays the
/// change and reinstates the stamp, so a channel restored across a scope
/// boundary logs correctly in the scope it re-enters.
#[derive(Debug, Clone, Copy)]
struct SavedState {
    change: StateChange,
    stamp: usize,
}

/// One state channel: current value plus the scope depth of its last change.
///
/// `value` is `None` until the first `reset`; a sentinel is never logged for
/// restore.
#[derive(Debug, Clone, Copy)]
struct Channel<T> {
    value: Option<T>,
    stamp: usize,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            value: None,
            stamp: 0,
        }
    }
}

/// Tracks current device state across nested drawing scopes.
///
/// Each channel is diffed independently; the first change to a channel inside
/// a scope logs the prior value, so `pop_scope` restores in O(changes) rather
/// than O(state size). The blend-equation channel is the deliberate
/// exception: its equality check is bypassed, so it is always treated as
/// changed. Kept bug-for-bug until confirmed otherwise.
///
/// Unbalanced push/pop is a programming error, not a recoverable condition.
#[derive(Debug, Default)]
pub struct StateStack {
    cull: Channel<CullMode>,
    depth_compare: Channel<CompareFunc>,
    depth_write: Channel<bool>,
    blend: Channel<bool>,
    blend_func: Channel<(BlendFactor, BlendFactor)>,
    blend_colour: Channel<[f32; 4]>,
    blend_equation: Channel<BlendEquation>,

    /// Prior values, logged on first in-scope change, replayed on pop.
    saved: Vec<SavedState>,
    /// Saved-log length at each open scope's push.
    markers: Vec<usize>,
    #[cfg(debug_assertions)]
    scope_labels: Vec<String>,
}

impl StateStack {
    /// A stack with every channel at its sentinel. Call [`reset`] before the
    /// first frame to install real baselines.
    ///
    /// [`reset`]: StateStack::reset
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the per-frame baseline on every channel and issue the full
    /// device state. Clears the scope depth and the saved log.
    pub fn reset(&mut self, device: &mut dyn RenderDevice) {
        debug_assert!(self.markers.is_empty(), "reset inside an open scope");
        self.markers.clear();
        self.saved.clear();
        #[cfg(debug_assertions)]
        self.scope_labels.clear();

        self.cull = Channel {
            value: Some(CullMode::Back),
            stamp: 0,
        };
        self.depth_compare = Channel {
            value: Some(CompareFunc::Less),
            stamp: 0,
        };
        self.depth_write = Channel {
            value: Some(true),
            stamp: 0,
        };
        let opaque = BlendState::opaque();
        self.blend = Channel {
            value: Some(opaque.enabled),
            stamp: 0,
        };
        self.blend_func = Channel {
            value: Some((opaque.source, opaque.dest)),
            stamp: 0,
        };
        self.blend_colour = Channel {
            value: Some(opaque.colour),
            stamp: 0,
        };
        self.blend_equation = Channel {
            value: Some(opaque.equation),
            stamp: 0,
        };

        device.set_cull_mode(CullMode::Back);
        device.set_depth_compare(CompareFunc::Less);
        device.set_depth_write(true);
        device.set_blend(&opaque);
    }

    /// Open a scope: changes applied after this are restored on the matching
    /// [`pop_scope`]. The label is kept in debug builds to check nesting.
    ///
    /// [`pop_scope`]: StateStack::pop_scope
    pub fn push_scope(&mut self, label: &str) {
        self.markers.push(self.saved.len());
        #[cfg(debug_assertions)]
        self.scope_labels.push(label.to_string());
        tracing::trace!(label, depth = self.markers.len(), "push scope");
    }

    /// Close the most recent scope, restoring every channel it touched.
    ///
    /// Panics on unbalanced nesting; in debug builds the label must match the
    /// corresponding push.
    pub fn pop_scope(&mut self, device: &mut dyn RenderDevice, label: &str) {
        #[cfg(debug_assertions)]
        {
            let opened = self
                .scope_labels
                .pop()
                .expect("pop_scope without matching push_scope");
            debug_assert_eq!(opened, label, "scope label mismatch on pop");
        }
        let marker = self
            .markers
            .pop()
            .expect("pop_scope without matching push_scope");

        // Replay the scope's slice in recorded order. Stamps of restored
        // channels are at least the new depth, so replay cannot log. Each
        // entry then reinstates the stamp it saved: the restored value dates
        // from that change, not from this pop.
        let scope_end = self.saved.len();
        for i in marker..scope_end {
            let entry = self.saved[i];
            self.apply(device, entry.change);
            self.restore_stamp(&entry.change, entry.stamp);
        }
        debug_assert_eq!(self.saved.len(), scope_end, "restore must not log");
        self.saved.truncate(marker);
        tracing::trace!(label, depth = self.markers.len(), "pop scope");
    }

    /// The core mutator: diff against the current value, log the prior value
    /// on the first in-scope change, store, and issue the device call.
    pub fn apply(&mut self, device: &mut dyn RenderDevice, change: StateChange) {
        let depth = self.markers.len();
        match change {
            StateChange::CullMode(mode) => {
                if self.cull.value == Some(mode) {
                    return;
                }
                if self.cull.stamp < depth {
                    if let Some(prior) = self.cull.value {
                        self.saved.push(SavedState {
                            change: StateChange::CullMode(prior),
                            stamp: self.cull.stamp,
                        });
                    }
                }
                self.cull.value = Some(mode);
                self.cull.stamp = depth;
                device.set_cull_mode(mode);
            }
            StateChange::DepthCompare(compare) => {
                if self.depth_compare.value == Some(compare) {
                    return;
                }
                if self.depth_compare.stamp < depth {
                    if let Some(prior) = self.depth_compare.value {
                        self.saved.push(SavedState {
                            change: StateChange::DepthCompare(prior),
                            stamp: self.depth_compare.stamp,
                        });
                    }
                }
                self.depth_compare.value = Some(compare);
                self.depth_compare.stamp = depth;
                device.set_depth_compare(compare);
            }
            StateChange::DepthWrite(enabled) => {
                if self.depth_write.value == Some(enabled) {
                    return;
                }
                if self.depth_write.stamp < depth {
                    if let Some(prior) = self.depth_write.value {
                        self.saved.push(SavedState {
                            change: StateChange::DepthWrite(prior),
                            stamp: self.depth_write.stamp,
                        });
                    }
                }
                self.depth_write.value = Some(enabled);
                self.depth_write.stamp = depth;
                device.set_depth_write(enabled);
            }
            StateChange::Blend(enabled) => {
                if self.blend.value == Some(enabled) {
                    return;
                }
                if self.blend.stamp < depth {
                    if let Some(prior) = self.blend.value {
                        self.saved.push(SavedState {
                            change: StateChange::Blend(prior),
                            stamp: self.blend.stamp,
                        });
                    }
                }
                self.blend.value = Some(enabled);
                self.blend.stamp = depth;
                let blend = self.blend_state();
                device.set_blend(&blend);
            }
            StateChange::BlendFunc { source, dest } => {
                if self.blend_func.value == Some((source, dest)) {
                    return;
                }
                if self.blend_func.stamp < depth {
                    if let Some((s, d)) = self.blend_func.value {
                        self.saved.push(SavedState {
                            change: StateChange::BlendFunc { source: s, dest: d },
                            stamp: self.blend_func.stamp,
                        });
                    }
                }
                self.blend_func.value = Some((source, dest));
                self.blend_func.stamp = depth;
                let blend = self.blend_state();
                device.set_blend(&blend);
            }
            StateChange::BlendColour(colour) => {
                if self.blend_colour.value == Some(colour) {
                    return;
                }
                if self.blend_colour.stamp < depth {
                    if let Some(prior) = self.blend_colour.value {
                        self.saved.push(SavedState {
                            change: StateChange::BlendColour(prior),
                            stamp: self.blend_colour.stamp,
                        });
                    }
                }
                self.blend_colour.value = Some(colour);
                self.blend_colour.stamp = depth;
                let blend = self.blend_state();
                device.set_blend(&blend);
            }
            StateChange::BlendEquation(equation) => {
                // No equality check: this channel is always treated as
                // changed. The stamp rule still bounds the log to one
                // entry per scope.
                if self.blend_equation.stamp < depth {
                    if let Some(prior) = self.blend_equation.value {
                        self.saved.push(SavedState {
                            change: StateChange::BlendEquation(prior),
                            stamp: self.blend_equation.stamp,
                        });
                    }
                }
                self.blend_equation.value = Some(equation);
                self.blend_equation.stamp = depth;
                let blend = self.blend_state();
                device.set_blend(&blend);
            }
        }
    }

    /// Reinstate a channel's stamp after a restore, including when the
    /// replayed value happened to equal the current one.
    fn restore_stamp(&mut self, change: &StateChange, stamp: usize) {
        match change {
            StateChange::CullMode(_) => self.cull.stamp = stamp,
            StateChange::DepthCompare(_) => self.depth_compare.stamp = stamp,
            StateChange::DepthWrite(_) => self.depth_write.stamp = stamp,
            StateChange::Blend(_) => self.blend.stamp = stamp,
            StateChange::BlendFunc { .. } => self.blend_func.stamp = stamp,
            StateChange::BlendColour(_) => self.blend_colour.stamp = stamp,
            StateChange::BlendEquation(_) => self.blend_equation.stamp = stamp,
        }
    }

    /// Apply every change in a declarative state block, in block order.
    pub fn apply_block(&mut self, device: &mut dyn RenderDevice, block: &crate::StateBlock) {
        for change in block.changes() {
            self.apply(device, *change);
        }
    }

    /// Current blend pipeline state; unset pieces read as the opaque
    /// baseline.
    pub fn blend_state(&self) -> BlendState {
        let opaque = BlendState::opaque();
        let (source, dest) = self.blend_func.value.unwrap_or((opaque.source, opaque.dest));
        BlendState {
            enabled: self.blend.value.unwrap_or(opaque.enabled),
            source,
            dest,
            colour: self.blend_colour.value.unwrap_or(opaque.colour),
            equation: self.blend_equation.value.unwrap_or(opaque.equation),
        }
    }

    /// Number of currently open scopes.
    pub fn scope_depth(&self) -> usize {
        self.markers.len()
    }

    /// Number of entries in the saved log across all open scopes.
    pub fn log_len(&self) -> usize {
        self.saved.len()
    }

    pub fn cull_mode(&self) -> Option<CullMode> {
        self.cull.value
    }

    pub fn depth_compare(&self) -> Option<CompareFunc> {
        self.depth_compare.value
    }

    pub fn depth_write(&self) -> Option<bool> {
        self.depth_write.value
    }

    pub fn blend_enabled(&self) -> Option<bool> {
        self.blend.value
    }

    pub fn blend_func(&self) -> Option<(BlendFactor, BlendFactor)> {
        self.blend_func.value
    }

    pub fn blend_colour(&self) -> Option<[f32; 4]> {
        self.blend_colour.value
    }

    pub fn blend_equation(&self) -> Option<BlendEquation> {
        self.blend_equation.value
    }
}
