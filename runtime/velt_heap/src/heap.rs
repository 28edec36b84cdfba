//! Process-scoped object heap backing boxed layouts and identity objects.
//!
//! The heap is an append-only handle table. Handles are opaque non-zero
//! 64-bit values; zero is reserved for null so a boxed slot can be one
//! atomic word. Heap objects are immutable once allocated: a boxed store
//! replaces the slot's handle, never the box contents, so boxed slots can
//! share a box safely.
//!
//! Allocation failure (out-of-memory) is delegated unchanged to the global
//! allocator; nothing here handles it.

use parking_lot::RwLock;
use std::fmt;

use crate::value::ValueInstance;

/// Opaque handle to a heap object. Never zero.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct ObjRef(u64);

impl ObjRef {
    /// Reconstruct a handle from its raw bits (e.g. decoded from a slot).
    ///
    /// Zero is the null encoding and is not a valid handle.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        debug_assert!(raw != 0, "zero is the null handle encoding");
        Self(raw)
    }

    /// Raw bits of the handle, as stored in slots.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjRef({})", self.0)
    }
}

/// One heap object.
#[derive(Clone, Debug)]
pub enum HeapObject {
    /// A boxed value object: identity-free, compared by contents.
    ValueBox(ValueInstance),
    /// An ordinary identity object: compared by handle.
    Identity,
}

/// Append-only object heap.
///
/// # Thread Safety
///
/// Allocation takes a write lock; lookups take a read lock and clone.
/// Handles are stable for the heap's lifetime.
pub struct Heap {
    objects: RwLock<Vec<HeapObject>>,
}

impl Heap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(Vec::new()),
        }
    }

    /// Allocate a boxed value object and return its handle.
    pub fn alloc_value_box(&self, instance: ValueInstance) -> ObjRef {
        self.alloc(HeapObject::ValueBox(instance))
    }

    /// Allocate an identity object and return its handle.
    pub fn alloc_identity(&self) -> ObjRef {
        self.alloc(HeapObject::Identity)
    }

    fn alloc(&self, object: HeapObject) -> ObjRef {
        let mut guard = self.objects.write();
        guard.push(object);
        // Handles are index + 1, keeping zero free for null.
        ObjRef(guard.len() as u64)
    }

    /// Look up the object for a handle.
    ///
    /// # Panics
    /// Panics if the handle was not created by this heap.
    pub fn get(&self, handle: ObjRef) -> HeapObject {
        let guard = self.objects.read();
        guard[(handle.raw() - 1) as usize].clone()
    }

    /// The boxed value instance behind a handle, or `None` for an
    /// identity object.
    pub fn value_box(&self, handle: ObjRef) -> Option<ValueInstance> {
        match self.get(handle) {
            HeapObject::ValueBox(instance) => Some(instance),
            HeapObject::Identity => None,
        }
    }

    /// Number of allocated objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// True if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
