//! Array and field storage operations.
//!
//! The sole caller-visible surface over the slot controller and the null
//! marker codec. A container is allocated against one resolved [`Layout`]
//! and keeps it for life; all access dispatches on `layout.kind`, so the
//! same `get`/`set` code serves boxed, flat-atomic, and flat-non-atomic
//! storage.
//!
//! The four collaborator-facing allocation entry points are
//! [`ValArray::null_restricted_atomic`],
//! [`ValArray::null_restricted_non_atomic`],
//! [`ValArray::nullable_atomic`], and [`ValArray::boxed`].

use velt_types::{
    DescriptorId, DescriptorTable, Layout, LayoutCache, LayoutKind, LayoutPolicy, NullPolicy,
    Placement,
};

use crate::codec;
use crate::error::{class_mismatch, index_out_of_range, null_restriction_violation, StoreResult};
use crate::heap::{Heap, ObjRef};
use crate::slot::SlotBlock;
use crate::value::ValueInstance;

/// Shared runtime state every storage operation needs: the descriptor
/// table, the layout cache, and the object heap.
#[derive(Copy, Clone)]
pub struct StoreCtx<'a> {
    pub table: &'a DescriptorTable,
    pub cache: &'a LayoutCache,
    pub heap: &'a Heap,
}

impl<'a> StoreCtx<'a> {
    pub fn new(table: &'a DescriptorTable, cache: &'a LayoutCache, heap: &'a Heap) -> Self {
        Self { table, cache, heap }
    }
}

/// One layout plus its slot storage; shared by arrays and single fields.
#[derive(Debug)]
struct SlotStore {
    layout: Layout,
    block: SlotBlock,
}

impl SlotStore {
    fn new(layout: Layout, len: usize) -> Self {
        layout.check_invariants();
        Self {
            layout,
            block: SlotBlock::new(layout.kind, layout.slot_words as usize, len),
        }
    }

    /// Decode one slot. `None` is "absent".
    fn read(&self, ctx: StoreCtx<'_>, slot: usize) -> Option<ValueInstance> {
        if matches!(self.layout.kind, LayoutKind::Boxed) {
            let mut word = [0u64];
            self.block.read(slot, &mut word);
            if word[0] == 0 {
                return None;
            }
            return ctx.heap.value_box(ObjRef::from_raw(word[0]));
        }

        // Empty null-restricted payloads have no storage at all; the only
        // possible value is the canonical empty instance.
        if self.block.words_per_slot() == 0 {
            return Some(ValueInstance::empty(self.layout.descriptor));
        }

        let mut words = vec![0u64; self.block.words_per_slot()];
        self.block.read(slot, &mut words);
        let bytes = codec::words_to_bytes(&words, self.layout.footprint_bytes as usize);

        if self.layout.null_marker_offset.is_some() && codec::is_null(&self.layout, &bytes) {
            return None;
        }
        Some(codec::decode_instance(ctx.table, self.layout.descriptor, &bytes))
    }

    /// Encode and store one slot. The caller has already bounds-checked.
    fn write(
        &self,
        ctx: StoreCtx<'_>,
        slot: usize,
        value: Option<&ValueInstance>,
    ) -> StoreResult<()> {
        let Some(instance) = value else {
            if self.layout.is_null_restricted() {
                return Err(null_restriction_violation());
            }
            self.write_null(slot);
            return Ok(());
        };

        if instance.descriptor() != self.layout.descriptor {
            return Err(class_mismatch(self.layout.descriptor, instance.descriptor()));
        }

        match self.layout.kind {
            LayoutKind::Boxed => {
                let handle = ctx.heap.alloc_value_box(instance.clone());
                self.block.write(slot, &[handle.raw()]);
            }
            LayoutKind::FlatAtomic | LayoutKind::FlatNonAtomic => {
                if self.block.words_per_slot() == 0 {
                    return Ok(());
                }
                let mut bytes = vec![0u8; self.block.words_per_slot() * 8];
                let footprint = self.layout.footprint_bytes as usize;
                codec::write_value(&self.layout, ctx.table, instance, &mut bytes[..footprint]);
                self.block.write(slot, &codec::bytes_to_words(&bytes));
            }
        }
        Ok(())
    }

    /// Store "absent" into a nullable slot.
    fn write_null(&self, slot: usize) {
        match self.layout.kind {
            LayoutKind::Boxed => self.block.write(slot, &[0]),
            // Zero words carry an absent marker; the stale payload is
            // unspecified until the next value write, so zeroing the whole
            // slot is as good as flipping the marker alone.
            LayoutKind::FlatAtomic | LayoutKind::FlatNonAtomic => {
                self.block.write(slot, &vec![0u64; self.block.words_per_slot()]);
            }
        }
    }
}

/// An array of value-typed slots with one fixed layout.
///
/// Two arrays of the same element type may hold different layouts (policy
/// changed between allocations, different entry points); callers must
/// consult the array's own predicates, never re-resolve from the element
/// type.
#[derive(Debug)]
pub struct ValArray {
    store: SlotStore,
    len: usize,
}

impl ValArray {
    /// Null-restricted array that never tears: wide types take the
    /// sequence-lock path rather than flattening non-atomically.
    pub fn null_restricted_atomic(
        ctx: StoreCtx<'_>,
        id: DescriptorId,
        len: usize,
        initial: &ValueInstance,
        policy: LayoutPolicy,
    ) -> StoreResult<Self> {
        let layout = ctx.cache.get_or_resolve(
            ctx.table,
            id,
            Placement::ArrayElement,
            NullPolicy::NullRestricted,
            policy - LayoutPolicy::NON_ATOMIC_FLATTENING,
        );
        Self::with_layout(ctx, layout, len, Some(initial))
    }

    /// Null-restricted array that trades atomicity for cheap access;
    /// narrow types still come out atomic because one word is free.
    pub fn null_restricted_non_atomic(
        ctx: StoreCtx<'_>,
        id: DescriptorId,
        len: usize,
        initial: &ValueInstance,
        policy: LayoutPolicy,
    ) -> StoreResult<Self> {
        let layout = ctx.cache.get_or_resolve(
            ctx.table,
            id,
            Placement::ArrayElement,
            NullPolicy::NullRestricted,
            policy,
        );
        Self::with_layout(ctx, layout, len, Some(initial))
    }

    /// Nullable array; flat when policy allows (marker byte appended),
    /// boxed otherwise. Slots default to absent unless `initial` is given.
    pub fn nullable_atomic(
        ctx: StoreCtx<'_>,
        id: DescriptorId,
        len: usize,
        initial: Option<&ValueInstance>,
        policy: LayoutPolicy,
    ) -> StoreResult<Self> {
        let layout = ctx.cache.get_or_resolve(
            ctx.table,
            id,
            Placement::ArrayElement,
            NullPolicy::Nullable,
            policy,
        );
        Self::with_layout(ctx, layout, len, initial)
    }

    /// Plain boxed array: every slot is one handle word, nullable.
    pub fn boxed(
        ctx: StoreCtx<'_>,
        id: DescriptorId,
        len: usize,
        initial: Option<&ValueInstance>,
    ) -> StoreResult<Self> {
        Self::with_layout(ctx, Layout::boxed(id, NullPolicy::Nullable), len, initial)
    }

    fn with_layout(
        ctx: StoreCtx<'_>,
        layout: Layout,
        len: usize,
        initial: Option<&ValueInstance>,
    ) -> StoreResult<Self> {
        if layout.is_null_restricted() && initial.is_none() {
            return Err(null_restriction_violation());
        }
        tracing::debug!(descriptor = layout.descriptor.raw(), %layout, len, "allocating array");

        let array = Self {
            store: SlotStore::new(layout, len),
            len,
        };
        if let Some(instance) = initial {
            // Every slot gets an independent copy of the initial value,
            // never a shared flat payload.
            for slot in 0..len {
                array.store.write(ctx, slot, Some(instance))?;
            }
        }
        Ok(array)
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length array.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The layout this array was allocated with. Never changes.
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.store.layout
    }

    /// The element value type.
    #[inline]
    pub fn descriptor(&self) -> DescriptorId {
        self.store.layout.descriptor
    }

    /// True when elements are stored inline.
    #[inline]
    pub fn is_flat(&self) -> bool {
        self.store.layout.is_flat()
    }

    /// True when slots reject "absent".
    #[inline]
    pub fn is_null_restricted(&self) -> bool {
        self.store.layout.is_null_restricted()
    }

    /// True when reads can never observe a torn element.
    #[inline]
    pub fn is_atomic(&self) -> bool {
        self.store.layout.is_atomic()
    }

    /// Read one element. `Ok(None)` is "absent" (nullable layouts only).
    pub fn get(&self, ctx: StoreCtx<'_>, index: usize) -> StoreResult<Option<ValueInstance>> {
        if index >= self.len {
            return Err(index_out_of_range(index, self.len));
        }
        Ok(self.store.read(ctx, index))
    }

    /// Write one element; `None` stores "absent".
    ///
    /// Storing `None` into a null-restricted array signals
    /// `NullRestrictionViolation` and leaves the slot unmodified.
    pub fn set(
        &self,
        ctx: StoreCtx<'_>,
        index: usize,
        value: Option<&ValueInstance>,
    ) -> StoreResult<()> {
        if index >= self.len {
            return Err(index_out_of_range(index, self.len));
        }
        self.store.write(ctx, index, value)
    }
}

/// Copy `len` elements from `src[src_off..]` onto `dst[dst_off..]`.
///
/// Behaves as an index-ordered element-by-element copy; when source and
/// destination are the same container with overlapping ranges, elements
/// are staged through a decoded temporary first. Layouts may differ in
/// kind and null policy (each element is decoded then re-encoded), but
/// the element type must match (`ClassMismatch` otherwise).
///
/// Copying an absent element into a null-restricted destination raises
/// `NullRestrictionViolation` at that element; already-copied elements are
/// not rolled back. The copy is atomic per element, not as a whole,
/// against concurrent mutators.
pub fn copy_range(
    ctx: StoreCtx<'_>,
    src: &ValArray,
    src_off: usize,
    dst: &ValArray,
    dst_off: usize,
    len: usize,
) -> StoreResult<()> {
    if len == 0 {
        return Ok(());
    }
    let src_end = check_range(src_off, len, src.len)?;
    let dst_end = check_range(dst_off, len, dst.len)?;
    if src.descriptor() != dst.descriptor() {
        return Err(class_mismatch(dst.descriptor(), src.descriptor()));
    }
    tracing::trace!(
        src = %src.layout(),
        dst = %dst.layout(),
        src_off,
        dst_off,
        len,
        "copy_range"
    );

    let same_container = std::ptr::eq(src, dst);
    let overlaps = same_container && src_off < dst_end && dst_off < src_end;
    if overlaps {
        let staged: Vec<Option<ValueInstance>> = (0..len)
            .map(|i| src.get(ctx, src_off + i))
            .collect::<StoreResult<_>>()?;
        for (i, value) in staged.iter().enumerate() {
            dst.set(ctx, dst_off + i, value.as_ref())?;
        }
    } else {
        for i in 0..len {
            let value = src.get(ctx, src_off + i)?;
            dst.set(ctx, dst_off + i, value.as_ref())?;
        }
    }
    Ok(())
}

fn check_range(offset: usize, len: usize, container_len: usize) -> StoreResult<usize> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| index_out_of_range(offset, container_len))?;
    if end > container_len {
        return Err(index_out_of_range(end - 1, container_len));
    }
    Ok(end)
}

/// A single value-typed object field: the `ObjectField` placement over the
/// same slot machinery as a length-1 array.
pub struct ValField {
    store: SlotStore,
}

impl ValField {
    /// Resolve the field layout and initialize the slot.
    ///
    /// A null-restricted field requires an initial value, same as array
    /// allocation.
    pub fn new(
        ctx: StoreCtx<'_>,
        id: DescriptorId,
        null_policy: NullPolicy,
        initial: Option<&ValueInstance>,
        policy: LayoutPolicy,
    ) -> StoreResult<Self> {
        if matches!(null_policy, NullPolicy::NullRestricted) && initial.is_none() {
            return Err(null_restriction_violation());
        }
        let layout =
            ctx.cache
                .get_or_resolve(ctx.table, id, Placement::ObjectField, null_policy, policy);
        let field = Self {
            store: SlotStore::new(layout, 1),
        };
        if let Some(instance) = initial {
            field.store.write(ctx, 0, Some(instance))?;
        }
        Ok(field)
    }

    /// The layout this field was resolved with. Never changes.
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.store.layout
    }

    /// True when the field is stored inline in its holder.
    #[inline]
    pub fn is_flat(&self) -> bool {
        self.store.layout.is_flat()
    }

    /// True when the field rejects "absent".
    #[inline]
    pub fn is_null_restricted(&self) -> bool {
        self.store.layout.is_null_restricted()
    }

    /// True when reads can never observe a torn value.
    #[inline]
    pub fn is_atomic(&self) -> bool {
        self.store.layout.is_atomic()
    }

    /// Read the field. `None` is "absent".
    pub fn get(&self, ctx: StoreCtx<'_>) -> Option<ValueInstance> {
        self.store.read(ctx, 0)
    }

    /// Write the field; `None` stores "absent", rejected for
    /// null-restricted fields.
    pub fn set(&self, ctx: StoreCtx<'_>, value: Option<&ValueInstance>) -> StoreResult<()> {
        self.store.write(ctx, 0, value)
    }
}
