//! Concrete placement decisions for value-typed slots.
//!
//! A [`Layout`] is the answer to "how is one slot of this value type stored
//! in this context": boxed or flat, atomic or non-atomic, null-restricted
//! or nullable, and how many bytes one slot occupies. Layouts are computed
//! once per `(descriptor, context)` by [`crate::resolve`] and are immutable
//! afterwards; a container holds exactly one Layout for its whole lifetime.
//!
//! A tagged [`LayoutKind`] replaces what the class hierarchy would express
//! with virtual dispatch: every storage operation matches on the kind.

use bitflags::bitflags;
use std::fmt;

use crate::descriptor::DescriptorId;

/// The hardware-atomic unit assumed by the runtime: one 64-bit word.
///
/// A flat footprint at or below this is atomic with a single load/store;
/// anything wider needs the sequence-lock path.
pub const ATOMIC_UNIT_BYTES: u32 = 8;

/// Physical representation of one value-typed slot.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LayoutKind {
    /// Stored behind a reference, like an identity object.
    /// Implicitly atomic (one handle word) and capable of holding null.
    Boxed,
    /// Fields stored inline; plain copies, tearing under concurrent
    /// writes is accepted, documented behavior.
    FlatNonAtomic,
    /// Fields stored inline; reads never observe a torn mix of writes.
    FlatAtomic,
}

impl LayoutKind {
    /// True for the inline representations.
    #[inline]
    pub const fn is_flat(self) -> bool {
        matches!(self, Self::FlatNonAtomic | Self::FlatAtomic)
    }

    /// True when reads can never observe a torn value.
    #[inline]
    pub const fn is_atomic(self) -> bool {
        matches!(self, Self::Boxed | Self::FlatAtomic)
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boxed => f.write_str("boxed"),
            Self::FlatNonAtomic => f.write_str("flat-non-atomic"),
            Self::FlatAtomic => f.write_str("flat-atomic"),
        }
    }
}

/// Whether a slot may hold "absent" in addition to a value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NullPolicy {
    /// The slot never holds "absent"; storing null is an error.
    NullRestricted,
    /// The slot may hold "absent", recorded out-of-band by a null marker
    /// when flat, or by a null handle when boxed.
    Nullable,
}

/// Where a slot lives: an array element or an object field.
///
/// The two placements are gated by independent policy switches.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Placement {
    ArrayElement,
    ObjectField,
}

bitflags! {
    /// Global flattening switches.
    ///
    /// These mirror the runtime's command-line flattening controls; the
    /// default enables everything. Resolution is a pure function of these
    /// flags, so distinct policies may coexist in one process (each
    /// container keeps the Layout it was allocated with).
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct LayoutPolicy: u32 {
        /// Permit flat layouts for array elements.
        const FLATTEN_ARRAYS = 1 << 0;
        /// Permit flat layouts for object fields.
        const FLATTEN_FIELDS = 1 << 1;
        /// Permit `FlatAtomic` layouts (including the wide seqlock path).
        const ATOMIC_FLATTENING = 1 << 2;
        /// Permit `FlatNonAtomic` layouts wider than the atomic unit.
        const NON_ATOMIC_FLATTENING = 1 << 3;
        /// Permit flat layouts for nullable slots (marker byte appended).
        const NULLABLE_FLATTENING = 1 << 4;
    }
}

impl LayoutPolicy {
    /// True if flattening is enabled for the given placement.
    #[inline]
    pub const fn flattening_enabled(self, placement: Placement) -> bool {
        match placement {
            Placement::ArrayElement => self.contains(Self::FLATTEN_ARRAYS),
            Placement::ObjectField => self.contains(Self::FLATTEN_FIELDS),
        }
    }
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self::all()
    }
}

/// One resolved placement decision: kind, null policy, and footprint.
///
/// Immutable once computed. `footprint_bytes` is the logical slot size
/// (payload plus marker byte when nullable and flat); `slot_words` is the
/// number of 64-bit words one slot occupies in storage.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Layout {
    /// The value type this layout was resolved for.
    pub descriptor: DescriptorId,
    /// Physical representation.
    pub kind: LayoutKind,
    /// Null semantics of the slot.
    pub null_policy: NullPolicy,
    /// Logical slot size in bytes, including the null marker if present.
    pub footprint_bytes: u32,
    /// Byte offset of the null marker within the slot.
    /// Present iff the layout is nullable and flat.
    pub null_marker_offset: Option<u32>,
    /// Whole 64-bit words per slot in backing storage.
    pub slot_words: u32,
}

impl Layout {
    /// The boxed layout for a descriptor: one handle word per slot.
    ///
    /// Boxed slots are implicitly atomic; the null policy still governs
    /// whether storing a null handle is permitted.
    pub fn boxed(descriptor: DescriptorId, null_policy: NullPolicy) -> Self {
        Self {
            descriptor,
            kind: LayoutKind::Boxed,
            null_policy,
            footprint_bytes: ATOMIC_UNIT_BYTES,
            null_marker_offset: None,
            slot_words: 1,
        }
    }

    /// True for the inline representations.
    #[inline]
    pub const fn is_flat(&self) -> bool {
        self.kind.is_flat()
    }

    /// True when reads can never observe a torn value.
    #[inline]
    pub const fn is_atomic(&self) -> bool {
        self.kind.is_atomic()
    }

    /// True when the slot rejects "absent".
    #[inline]
    pub const fn is_null_restricted(&self) -> bool {
        matches!(self.null_policy, NullPolicy::NullRestricted)
    }

    /// Byte stride between consecutive array slots in backing storage.
    #[inline]
    pub const fn stride_bytes(&self) -> u32 {
        self.slot_words * ATOMIC_UNIT_BYTES
    }

    /// Check the representation invariants that storage relies on.
    ///
    /// A nullable flat layout must carry a marker and be atomic: a
    /// non-atomic flat slot cannot co-update marker and payload, so a
    /// concurrent reader could see a torn marker/payload pair.
    pub fn check_invariants(&self) {
        if self.is_flat() && !self.is_null_restricted() {
            debug_assert!(self.null_marker_offset.is_some());
            debug_assert!(matches!(self.kind, LayoutKind::FlatAtomic));
        }
        if !self.is_flat() || self.is_null_restricted() {
            debug_assert!(self.null_marker_offset.is_none());
        }
        debug_assert!(
            self.slot_words == 0 || self.footprint_bytes <= self.slot_words * ATOMIC_UNIT_BYTES
        );
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let null = match self.null_policy {
            NullPolicy::NullRestricted => "null-restricted",
            NullPolicy::Nullable => "nullable",
        };
        write!(
            f,
            "{} {} ({} bytes)",
            null, self.kind, self.footprint_bytes
        )
    }
}
