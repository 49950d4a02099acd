//! The value heap: a slot arena holding everything that is not an immediate.
//!
//! Strings, BigInts, scope frames, and object records live here; a
//! [`HeapId`] is a plain index, so `Value` stays `Copy`-cheap and clone-safe.
//! Slots freed by explicit interpreter action (never by a collector — GC
//! timing is unobservable by design) go on a free list for reuse; the whole
//! arena is dropped with its interpreter.

use std::collections::BTreeMap;

use num_bigint::BigInt;

use crate::{
    env::Scope,
    error::RunResult,
    object::JsObject,
    resource::Tracker,
};

/// Index of a heap slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub(crate) struct HeapId(u32);

impl HeapId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Heap-allocated payloads.
#[derive(Debug)]
pub(crate) enum HeapData {
    /// A computed (non-interned) string.
    Str(String),
    /// An arbitrary-precision integer.
    BigInt(BigInt),
    /// A lexical scope frame (captured by closures, generators, modules).
    Scope(Scope),
    /// An object record, ordinary or exotic.
    Object(JsObject),
}

impl HeapData {
    /// Static variant name, used for stats breakdowns.
    fn variant_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "Str",
            Self::BigInt(_) => "BigInt",
            Self::Scope(_) => "Scope",
            Self::Object(_) => "Object",
        }
    }

    /// Rough estimate of the allocation's size in bytes, fed to the resource
    /// tracker. Deliberately coarse: the sandbox cares about orders of
    /// magnitude, not exact byte counts.
    fn estimate_size(&self) -> usize {
        let base = size_of::<Self>();
        base + match self {
            Self::Str(s) => s.capacity(),
            Self::BigInt(b) => b.bits() as usize / 8 + 16,
            Self::Scope(s) => s.estimate_size(),
            Self::Object(o) => o.estimate_size(),
        }
    }
}

/// Snapshot of heap state at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Total number of live slots.
    pub live_objects: usize,
    /// Number of free (recycled) slots available for reuse.
    pub free_slots: usize,
    /// Total heap capacity (live + free).
    pub total_slots: usize,
    /// Breakdown of live slots by `HeapData` variant name.
    ///
    /// `BTreeMap` keeps iteration deterministic for display and comparison.
    pub objects_by_type: BTreeMap<&'static str, usize>,
    /// Number of dynamically interned strings.
    pub interned_strings: usize,
    /// Tracker's current memory estimate in bytes.
    pub memory_bytes: usize,
}

/// The slot arena.
#[derive(Debug)]
pub(crate) struct Heap {
    slots: Vec<Option<HeapData>>,
    free: Vec<u32>,
    pub tracker: Tracker,
}

impl Heap {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            tracker,
        }
    }

    /// Allocates a slot, reusing the free list when possible.
    pub fn alloc(&mut self, data: HeapData) -> RunResult<HeapId> {
        self.tracker.on_allocate(data.estimate_size())?;
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(data);
            Ok(HeapId(idx))
        } else {
            let idx = u32::try_from(self.slots.len()).expect("heap slot count exceeds u32");
            self.slots.push(Some(data));
            Ok(HeapId(idx))
        }
    }

    /// Frees a slot. Only used for short-lived internals (e.g. a scope
    /// discarded on abrupt exit before anything captured it); reachable data
    /// is simply left alive until the interpreter is dropped.
    pub fn free(&mut self, id: HeapId) {
        if let Some(data) = self.slots[id.index()].take() {
            self.tracker.on_free(data.estimate_size());
            self.free.push(id.0);
        }
    }

    pub fn get(&self, id: HeapId) -> &HeapData {
        self.slots[id.index()].as_ref().expect("use of freed heap slot")
    }

    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        self.slots[id.index()].as_mut().expect("use of freed heap slot")
    }

    // Typed accessors. These panic on a kind mismatch, which indicates an
    // interpreter bug rather than a user error: callers check `Value` tags
    // before dereferencing.

    pub fn obj(&self, id: HeapId) -> &JsObject {
        match self.get(id) {
            HeapData::Object(o) => o,
            other => panic!("expected Object at {id:?}, found {}", other.variant_name()),
        }
    }

    pub fn obj_mut(&mut self, id: HeapId) -> &mut JsObject {
        match self.get_mut(id) {
            HeapData::Object(o) => o,
            other => panic!("expected Object at {id:?}, found {}", other.variant_name()),
        }
    }

    /// Returns the object record at `id`, or `None` when the slot holds a
    /// non-object (string, BigInt, scope).
    pub fn as_obj(&self, id: HeapId) -> Option<&JsObject> {
        match self.get(id) {
            HeapData::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn str_(&self, id: HeapId) -> &str {
        match self.get(id) {
            HeapData::Str(s) => s,
            other => panic!("expected Str at {id:?}, found {}", other.variant_name()),
        }
    }

    pub fn bigint(&self, id: HeapId) -> &BigInt {
        match self.get(id) {
            HeapData::BigInt(b) => b,
            other => panic!("expected BigInt at {id:?}, found {}", other.variant_name()),
        }
    }

    pub fn scope(&self, id: HeapId) -> &Scope {
        match self.get(id) {
            HeapData::Scope(s) => s,
            other => panic!("expected Scope at {id:?}, found {}", other.variant_name()),
        }
    }

    pub fn scope_mut(&mut self, id: HeapId) -> &mut Scope {
        match self.get_mut(id) {
            HeapData::Scope(s) => s,
            other => panic!("expected Scope at {id:?}, found {}", other.variant_name()),
        }
    }

    /// Computes a stats snapshot; `interned_strings` is supplied by the
    /// caller since the interner lives outside the heap.
    pub fn stats(&self, interned_strings: usize) -> HeapStats {
        let mut objects_by_type = BTreeMap::new();
        let mut live = 0usize;
        for slot in &self.slots {
            if let Some(data) = slot {
                live += 1;
                *objects_by_type.entry(data.variant_name()).or_insert(0) += 1;
            }
        }
        HeapStats {
            live_objects: live,
            free_slots: self.free.len(),
            total_slots: self.slots.len(),
            objects_by_type,
            interned_strings,
            memory_bytes: self.tracker.memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_reuse() {
        let mut heap = Heap::new(Tracker::default());
        let a = heap.alloc(HeapData::Str("hello".to_owned())).unwrap();
        assert_eq!(heap.str_(a), "hello");
        heap.free(a);
        let b = heap.alloc(HeapData::Str("world".to_owned())).unwrap();
        // freed slot is recycled
        assert_eq!(a, b);
        assert_eq!(heap.str_(b), "world");
    }

    #[test]
    fn stats_counts_by_variant() {
        let mut heap = Heap::new(Tracker::default());
        heap.alloc(HeapData::Str("x".to_owned())).unwrap();
        heap.alloc(HeapData::BigInt(BigInt::from(7))).unwrap();
        let stats = heap.stats(0);
        assert_eq!(stats.live_objects, 2);
        assert_eq!(stats.objects_by_type.get("Str"), Some(&1));
        assert_eq!(stats.objects_by_type.get("BigInt"), Some(&1));
    }
}
