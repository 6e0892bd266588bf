use framespace_common::DataKind;
use std::collections::{BTreeMap, BTreeSet};

/// Handle to a registered shader-data slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotRef(pub u32);

/// Update function of a derived slot: reads its declared inputs through the
/// store and writes its own bytes in place.
pub type UpdateFn = Box<dyn Fn(&ShaderDataStore, &mut [u8])>;

const NULL_OFFSET: usize = usize::MAX;

struct Slot {
    tag: String,
    offset: usize,
    size: usize,
    kind: Option<DataKind>,
    has_value: bool,
    update: Option<UpdateFn>,
    config: Option<crate::config::ConfigFn>,
    dependents: BTreeSet<SlotRef>,
}

impl Slot {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            offset: NULL_OFFSET,
            size: 0,
            kind: None,
            has_value: false,
            update: None,
            config: None,
            dependents: BTreeSet::new(),
        }
    }
}

/// Registry of named per-frame values over a growable byte arena.
///
/// Base slots are set directly; derived slots carry an update function and a
/// place in their inputs' dependent sets. Setting a slot notifies its direct
/// dependents exactly once; dependents of a dependent are not notified
/// unless they are also registered against the slot that changed.
#[derive(Default)]
pub struct ShaderDataStore {
    slots: Vec<Slot>,
    refs_by_tag: BTreeMap<String, SlotRef>,
    arena: Vec<u8>,
    scratch: Vec<u8>,
}

impl ShaderDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag, or return the existing ref if already registered.
    /// Never fails.
    pub fn add_slot(&mut self, tag: &str) -> SlotRef {
        if let Some(&slot) = self.refs_by_tag.get(tag) {
            return slot;
        }
        let slot = SlotRef(self.slots.len() as u32);
        self.slots.push(Slot::new(tag));
        self.refs_by_tag.insert(tag.to_string(), slot);
        tracing::trace!(tag, ?slot, "add shader data slot");
        slot
    }

    /// Look up a previously registered tag.
    pub fn ref_from_tag(&self, tag: &str) -> Option<SlotRef> {
        self.refs_by_tag.get(tag).copied()
    }

    /// Tag a slot was registered under.
    pub fn tag(&self, slot: SlotRef) -> &str {
        &self.slot(slot).tag
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Declare the expected shape of a slot. Raw writes of a different size
    /// fail fast afterwards.
    pub fn set_kind(&mut self, slot: SlotRef, kind: DataKind) {
        let s = self.slot_mut(slot);
        if s.has_value {
            assert_eq!(
                s.size,
                kind.byte_size(),
                "slot {:?} already holds {} bytes, kind wants {}",
                s.tag,
                s.size,
                kind.byte_size()
            );
        }
        s.kind = Some(kind);
    }

    pub fn kind(&self, slot: SlotRef) -> Option<DataKind> {
        self.slot(slot).kind
    }

    /// Store raw bytes into a slot, then notify its direct dependents.
    ///
    /// Backing storage is reallocated only when the size changes. Writing a
    /// size that contradicts a declared kind is a programming error.
    pub fn set_raw(&mut self, slot: SlotRef, bytes: &[u8]) {
        debug_assert_eq!(bytes.len() % 4, 0, "slot data must be u32-granular");
        let index = slot.0 as usize;
        let arena = &mut self.arena;
        let s = self
            .slots
            .get_mut(index)
            .expect("set through a stale slot ref");
        if let Some(kind) = s.kind {
            assert_eq!(
                bytes.len(),
                kind.byte_size(),
                "slot {:?} declared {:?}, write of {} bytes",
                s.tag,
                kind,
                bytes.len()
            );
        }
        if s.offset == NULL_OFFSET || s.size != bytes.len() {
            s.offset = allocate(arena, bytes.len());
            s.size = bytes.len();
        }
        arena[s.offset..s.offset + bytes.len()].copy_from_slice(bytes);
        s.has_value = true;

        // One-hop fan-out: direct dependents only.
        let dependents: Vec<SlotRef> = self.slots[index].dependents.iter().copied().collect();
        for dependent in dependents {
            self.run_update(dependent);
        }
    }

    /// Current raw bytes of a slot. Reading a never-set slot is a caller
    /// error and panics.
    pub fn read_raw(&self, slot: SlotRef) -> &[u8] {
        let s = self.slot(slot);
        assert!(s.has_value, "read of never-set slot {:?}", s.tag);
        &self.arena[s.offset..s.offset + s.size]
    }

    /// Typed write; the value's byte image goes through [`set_raw`].
    ///
    /// [`set_raw`]: ShaderDataStore::set_raw
    pub fn set_value<T: bytemuck::Pod>(&mut self, slot: SlotRef, value: T) {
        self.set_raw(slot, bytemuck::bytes_of(&value));
    }

    /// Typed read; the stored size must match `T` exactly.
    pub fn value<T: bytemuck::Pod>(&self, slot: SlotRef) -> T {
        let bytes = self.read_raw(slot);
        assert_eq!(
            bytes.len(),
            std::mem::size_of::<T>(),
            "typed read of slot {:?}: stored {} bytes, asked for {}",
            self.slot(slot).tag,
            bytes.len(),
            std::mem::size_of::<T>()
        );
        bytemuck::pod_read_unaligned(bytes)
    }

    /// Make `target` a derived slot: install its update function, add it to
    /// each dependency's dependent set, and invoke the function once to prime
    /// the value.
    ///
    /// The target must already have storage (an initial `set_raw`/`set_value`
    /// fixes its size) so the priming call has somewhere to write.
    pub fn register_update(
        &mut self,
        target: SlotRef,
        deps: &[SlotRef],
        update: impl Fn(&ShaderDataStore, &mut [u8]) + 'static,
    ) {
        assert!(
            self.slot(target).offset != NULL_OFFSET,
            "register_update on {:?} before its storage exists",
            self.slot(target).tag
        );
        self.slot_mut(target).update = Some(Box::new(update));
        for &dep in deps {
            self.slot_mut(dep).dependents.insert(target);
        }
        self.run_update(target);
    }

    /// Install the parser that turns a declarative value into this slot's
    /// bytes.
    pub fn register_config(&mut self, slot: SlotRef, config: crate::config::ConfigFn) {
        self.slot_mut(slot).config = Some(config);
    }

    /// Apply a declarative value through the slot's registered config
    /// function. Returns false if the slot has none.
    pub fn set_from_config(&mut self, slot: SlotRef, value: &serde_json::Value) -> bool {
        let Some(config) = self.slot(slot).config else {
            return false;
        };
        config(self, slot, value);
        true
    }

    /// Invoke a derived slot's update function against current inputs.
    fn run_update(&mut self, target: SlotRef) {
        let index = target.0 as usize;
        let Some(update) = self.slots[index].update.take() else {
            return;
        };
        let (offset, size) = (self.slots[index].offset, self.slots[index].size);

        // The update reads the store while writing its own bytes, so the
        // write goes through a reusable scratch buffer.
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.extend_from_slice(&self.arena[offset..offset + size]);
        update(self, &mut scratch);
        self.arena[offset..offset + size].copy_from_slice(&scratch);
        self.scratch = scratch;

        let s = &mut self.slots[index];
        s.has_value = true;
        s.update = Some(update);
        tracing::trace!(tag = %s.tag, "derived slot updated");
    }

    fn slot(&self, slot: SlotRef) -> &Slot {
        self.slots
            .get(slot.0 as usize)
            .expect("access through a stale slot ref")
    }

    fn slot_mut(&mut self, slot: SlotRef) -> &mut Slot {
        self.slots
            .get_mut(slot.0 as usize)
            .expect("access through a stale slot ref")
    }
}

/// Append-only arena allocation, 4-byte aligned. Old ranges are abandoned on
/// reallocation; the arena lives for the renderer instance.
fn allocate(arena: &mut Vec<u8>, size: usize) -> usize {
    let offset = arena.len().next_multiple_of(4);
    arena.resize(offset + size, 0);
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_bytes(v: f32) -> [u8; 4] {
        v.to_le_bytes()
    }

    #[test]
    fn add_slot_is_idempotent() {
        let mut store = ShaderDataStore::new();
        let a = store.add_slot("time");
        let b = store.add_slot("time");
        assert_eq!(a, b);
        assert_eq!(store.slot_count(), 1);
        assert_eq!(store.ref_from_tag("time"), Some(a));
        assert_eq!(store.ref_from_tag("pulse"), None);
    }

    #[test]
    fn raw_round_trip() {
        let mut store = ShaderDataStore::new();
        let slot = store.add_slot("time");
        store.set_raw(slot, &f32_bytes(0.25));
        assert_eq!(store.read_raw(slot), &f32_bytes(0.25));
        assert_eq!(store.value::<f32>(slot), 0.25);
    }

    #[test]
    fn same_size_write_reuses_storage() {
        let mut store = ShaderDataStore::new();
        let slot = store.add_slot("x");
        store.set_value(slot, 1.0f32);
        let len_after_first = store.arena.len();
        store.set_value(slot, 2.0f32);
        assert_eq!(store.arena.len(), len_after_first);
        assert_eq!(store.value::<f32>(slot), 2.0);
    }

    #[test]
    fn size_change_reallocates() {
        let mut store = ShaderDataStore::new();
        let slot = store.add_slot("x");
        store.set_value(slot, 1.0f32);
        let len_after_first = store.arena.len();
        store.set_value(slot, [1.0f32, 2.0]);
        assert!(store.arena.len() > len_after_first);
        assert_eq!(store.value::<[f32; 2]>(slot), [1.0, 2.0]);
    }

    #[test]
    fn dependents_update_immediately() {
        let mut store = ShaderDataStore::new();
        let a = store.add_slot("a");
        let b = store.add_slot("b");
        let sum = store.add_slot("sum");
        store.set_value(a, 1.0f32);
        store.set_value(b, 2.0f32);
        store.set_value(sum, 0.0f32);
        store.register_update(sum, &[a, b], move |s, out| {
            let total = s.value::<f32>(a) + s.value::<f32>(b);
            out.copy_from_slice(&total.to_le_bytes());
        });
        // Primed at registration.
        assert_eq!(store.value::<f32>(sum), 3.0);
        store.set_value(a, 10.0f32);
        assert_eq!(store.value::<f32>(sum), 12.0);
        store.set_value(b, 0.5f32);
        assert_eq!(store.value::<f32>(sum), 10.5);
    }

    #[test]
    fn propagation_is_exactly_one_hop() {
        let mut store = ShaderDataStore::new();
        let base = store.add_slot("base");
        let d1 = store.add_slot("d1");
        let d2 = store.add_slot("d2");
        store.set_value(base, 1.0f32);
        store.set_value(d1, 0.0f32);
        store.set_value(d2, 0.0f32);
        store.register_update(d1, &[base], move |s, out| {
            let v = s.value::<f32>(base) * 2.0;
            out.copy_from_slice(&v.to_le_bytes());
        });
        store.register_update(d2, &[d1], move |s, out| {
            let v = s.value::<f32>(d1) + 100.0;
            out.copy_from_slice(&v.to_le_bytes());
        });
        assert_eq!(store.value::<f32>(d1), 2.0);
        assert_eq!(store.value::<f32>(d2), 102.0);

        // Setting base updates d1 (direct dependent) but must NOT reach d2:
        // the fan-out is one hop, and this pins that behaviour.
        store.set_value(base, 5.0f32);
        assert_eq!(store.value::<f32>(d1), 10.0);
        assert_eq!(store.value::<f32>(d2), 102.0);

        // Setting d1 directly does reach d2.
        store.set_value(d1, 3.0f32);
        assert_eq!(store.value::<f32>(d2), 103.0);
    }

    #[test]
    fn chained_consistency_requires_direct_registration() {
        let mut store = ShaderDataStore::new();
        let base = store.add_slot("base");
        let d1 = store.add_slot("d1");
        let d2 = store.add_slot("d2");
        store.set_value(base, 1.0f32);
        store.set_value(d1, 0.0f32);
        store.set_value(d2, 0.0f32);
        store.register_update(d1, &[base], move |s, out| {
            let v = s.value::<f32>(base) * 2.0;
            out.copy_from_slice(&v.to_le_bytes());
        });
        // d2 reads d1 but registers against base as well, the workaround the
        // one-hop design requires.
        store.register_update(d2, &[d1, base], move |s, out| {
            let v = s.value::<f32>(d1) + 100.0;
            out.copy_from_slice(&v.to_le_bytes());
        });
        store.set_value(base, 4.0f32);
        assert_eq!(store.value::<f32>(d2), 108.0);
    }

    #[test]
    fn dependents_notified_once_per_set() {
        use std::cell::Cell;
        use std::rc::Rc;
        let mut store = ShaderDataStore::new();
        let a = store.add_slot("a");
        let derived = store.add_slot("derived");
        store.set_value(a, 0.0f32);
        store.set_value(derived, 0.0f32);
        let count = Rc::new(Cell::new(0u32));
        let seen = count.clone();
        store.register_update(derived, &[a], move |_, _| {
            seen.set(seen.get() + 1);
        });
        assert_eq!(count.get(), 1); // priming call
        store.set_value(a, 1.0f32);
        assert_eq!(count.get(), 2);
    }

    #[test]
    #[should_panic(expected = "read of never-set slot")]
    fn reading_unset_slot_panics() {
        let mut store = ShaderDataStore::new();
        let slot = store.add_slot("ghost");
        store.read_raw(slot);
    }

    #[test]
    #[should_panic(expected = "typed read")]
    fn typed_read_of_wrong_size_panics() {
        let mut store = ShaderDataStore::new();
        let slot = store.add_slot("x");
        store.set_value(slot, 1.0f32);
        let _ = store.value::<[f32; 4]>(slot);
    }

    #[test]
    #[should_panic(expected = "declared")]
    fn kind_mismatch_panics() {
        let mut store = ShaderDataStore::new();
        let slot = store.add_slot("x");
        store.set_kind(slot, DataKind::Vec2);
        store.set_value(slot, 1.0f32);
    }

    #[test]
    fn arena_offsets_are_aligned() {
        let mut store = ShaderDataStore::new();
        let a = store.add_slot("a");
        let b = store.add_slot("b");
        store.set_value(a, 1.0f32);
        store.set_value(b, [1.0f32, 2.0, 3.0]);
        assert_eq!(store.slot(a).offset % 4, 0);
        assert_eq!(store.slot(b).offset % 4, 0);
    }
}
