//! Value descriptors: per-type physical facts, computed once.
//!
//! A [`ValueDescriptor`] is created when a value type is registered with the
//! [`DescriptorTable`] and is immutable afterwards. Field offsets, total
//! size, alignment, and property flags are all resolved at registration so
//! use sites never re-derive them.
//!
//! # Design (from `ori_types`)
//!
//! Descriptors are referenced by a 32-bit handle ([`DescriptorId`]) into an
//! append-only table, the same shape as the type pool's `Idx`. Property
//! queries are O(1) reads of pre-computed [`DescriptorFlags`].

use bitflags::bitflags;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::prim::PrimType;

/// Size in bytes of a reference (object handle) stored inside a payload.
pub(crate) const REF_BYTES: u32 = 8;

/// A 32-bit handle into a [`DescriptorTable`].
///
/// Descriptors are compared by handle equality; two registrations of the
/// same field list still produce distinct value types.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct DescriptorId(u32);

impl DescriptorId {
    /// Create a handle from a raw u32. The caller must ensure the handle
    /// is valid in the table it is used with.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DescriptorId({})", self.0)
    }
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value-type#{}", self.0)
    }
}

/// Declared type of a value-object field.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FieldType {
    /// Primitive field, stored inline at its natural size.
    Prim(PrimType),
    /// Reference to an identity object (or a boxed value object).
    Reference,
    /// Field of another, already-registered value type.
    ///
    /// Inlined into the payload when the field declaration and the target
    /// descriptor both allow flattening; stored as a reference otherwise.
    Value(DescriptorId),
}

/// One field as declared at registration time.
#[derive(Clone, Debug)]
pub struct FieldDecl {
    /// Field name, for diagnostics only.
    pub name: String,
    /// Declared type.
    pub ty: FieldType,
    /// Whether this use site permits flattening a value-typed field.
    ///
    /// Ignored for primitive and reference fields.
    pub can_be_flattened: bool,
}

impl FieldDecl {
    /// Primitive field.
    pub fn prim(name: impl Into<String>, prim: PrimType) -> Self {
        Self {
            name: name.into(),
            ty: FieldType::Prim(prim),
            can_be_flattened: false,
        }
    }

    /// Reference field.
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: FieldType::Reference,
            can_be_flattened: false,
        }
    }

    /// Value-typed field that may be inlined into the payload.
    pub fn value(name: impl Into<String>, id: DescriptorId) -> Self {
        Self {
            name: name.into(),
            ty: FieldType::Value(id),
            can_be_flattened: true,
        }
    }
}

bitflags! {
    /// Pre-computed descriptor properties for O(1) queries.
    ///
    /// Computed once at registration time, never recomputed.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct DescriptorFlags: u32 {
        /// The type has no fields; its only state is its presence.
        const IS_EMPTY = 1 << 0;
        /// The payload contains at least one reference word.
        const HAS_REFERENCES = 1 << 1;
        /// At least one field is itself a value type.
        const HAS_IDENTITY_FREE_FIELDS = 1 << 2;
        /// At least one value-typed field is inlined into the payload.
        const HAS_FLAT_FIELDS = 1 << 3;
        /// The type opted out of flattening; every placement is boxed.
        const NOT_FLATTENABLE = 1 << 4;
    }
}

/// One field with its resolved physical placement inside the payload.
#[derive(Clone, Debug)]
pub struct ResolvedField {
    /// Field name, for diagnostics only.
    pub name: String,
    /// Declared type.
    pub ty: FieldType,
    /// Byte offset from the start of the payload.
    pub offset_bytes: u32,
    /// True for a value-typed field whose payload is inlined here.
    /// False value-typed fields occupy a reference word instead.
    pub inlined: bool,
}

impl ResolvedField {
    /// Physical size of this field within the payload, given the table
    /// the field's descriptor lives in.
    pub fn size_bytes(&self, table: &DescriptorTable) -> u32 {
        match self.ty {
            FieldType::Prim(p) => p.size_bytes(),
            FieldType::Reference => REF_BYTES,
            FieldType::Value(id) if self.inlined => table.get(id).size_bytes(),
            FieldType::Value(_) => REF_BYTES,
        }
    }
}

/// Static per-type facts for one value type.
///
/// Immutable once resolved; shared by all use sites via `Arc`.
#[derive(Clone, Debug)]
pub struct ValueDescriptor {
    name: String,
    fields: Vec<ResolvedField>,
    size_bits: u32,
    alignment_bits: u32,
    flags: DescriptorFlags,
}

impl ValueDescriptor {
    /// Type name, for diagnostics only.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order, with resolved offsets.
    #[inline]
    pub fn fields(&self) -> &[ResolvedField] {
        &self.fields
    }

    /// Payload size in bits, excluding any null marker.
    #[inline]
    pub fn size_bits(&self) -> u32 {
        self.size_bits
    }

    /// Payload size in bytes, excluding any null marker.
    #[inline]
    pub fn size_bytes(&self) -> u32 {
        self.size_bits / 8
    }

    /// Required payload alignment in bits.
    #[inline]
    pub fn alignment_bits(&self) -> u32 {
        self.alignment_bits
    }

    /// Required payload alignment in bytes.
    #[inline]
    pub fn alignment_bytes(&self) -> u32 {
        self.alignment_bits / 8
    }

    /// Pre-computed property flags.
    #[inline]
    pub fn flags(&self) -> DescriptorFlags {
        self.flags
    }

    /// True if the type has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.flags.contains(DescriptorFlags::IS_EMPTY)
    }

    /// True if any placement of this type may use a flat layout.
    #[inline]
    pub fn is_flattenable(&self) -> bool {
        !self.flags.contains(DescriptorFlags::NOT_FLATTENABLE)
    }

    /// True if the payload contains reference words the collector must see.
    #[inline]
    pub fn has_references(&self) -> bool {
        self.flags.contains(DescriptorFlags::HAS_REFERENCES)
    }

    /// True if any field is itself a value type.
    #[inline]
    pub fn has_identity_free_fields(&self) -> bool {
        self.flags.contains(DescriptorFlags::HAS_IDENTITY_FREE_FIELDS)
    }
}

/// Error when registering a value type fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// A field referenced a descriptor handle not present in the table.
    ///
    /// Fields may only reference already-registered types, which also
    /// makes descriptor recursion impossible by construction.
    UnknownFieldType { field_index: usize },
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::UnknownFieldType { field_index } => {
                write!(f, "field {field_index} references an unregistered value type")
            }
        }
    }
}

impl std::error::Error for DescriptorError {}

/// Append-only registry of value descriptors.
///
/// # Thread Safety
///
/// Registration takes a write lock; lookups take a read lock and hand out
/// `Arc` clones. Handles are stable for the table's lifetime.
pub struct DescriptorTable {
    descriptors: RwLock<Vec<Arc<ValueDescriptor>>>,
}

impl DescriptorTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            descriptors: RwLock::new(Vec::new()),
        }
    }

    /// Register a value type, resolving its physical facts.
    ///
    /// `flatten_eligible` is the type-level opt-out discovered at
    /// load time (e.g. from an annotation); ineligible types resolve to
    /// boxed layouts in every context.
    pub fn register(
        &self,
        name: impl Into<String>,
        fields: Vec<FieldDecl>,
        flatten_eligible: bool,
    ) -> Result<DescriptorId, DescriptorError> {
        let resolved = self.resolve_fields(fields)?;
        let mut flags = resolved.flags;
        if !flatten_eligible {
            flags |= DescriptorFlags::NOT_FLATTENABLE;
        }

        let descriptor = Arc::new(ValueDescriptor {
            name: name.into(),
            fields: resolved.fields,
            size_bits: resolved.size_bytes * 8,
            alignment_bits: resolved.align_bytes * 8,
            flags,
        });

        let mut guard = self.descriptors.write();
        let raw = u32::try_from(guard.len())
            .unwrap_or_else(|_| panic!("descriptor table exceeded u32::MAX entries"));
        guard.push(descriptor);
        Ok(DescriptorId::from_raw(raw))
    }

    /// Look up the descriptor for a handle.
    ///
    /// # Panics
    /// Panics if the handle was not created by this table.
    pub fn get(&self, id: DescriptorId) -> Arc<ValueDescriptor> {
        let guard = self.descriptors.read();
        Arc::clone(&guard[id.raw() as usize])
    }

    /// True if `id` is a valid handle in this table.
    pub fn contains(&self, id: DescriptorId) -> bool {
        (id.raw() as usize) < self.descriptors.read().len()
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    /// True if no descriptors have been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assign offsets and compute flags for a declared field list.
    fn resolve_fields(&self, fields: Vec<FieldDecl>) -> Result<ResolvedLayout, DescriptorError> {
        let guard = self.descriptors.read();

        let mut flags = DescriptorFlags::empty();
        let mut resolved = Vec::with_capacity(fields.len());
        let mut offset = 0u32;
        let mut align = 1u32;

        for (field_index, decl) in fields.into_iter().enumerate() {
            let (size, field_align, inlined) = match decl.ty {
                FieldType::Prim(p) => (p.size_bytes(), p.align_bytes(), false),
                FieldType::Reference => {
                    flags |= DescriptorFlags::HAS_REFERENCES;
                    (REF_BYTES, REF_BYTES, false)
                }
                FieldType::Value(id) => {
                    let target = guard
                        .get(id.raw() as usize)
                        .ok_or(DescriptorError::UnknownFieldType { field_index })?;
                    flags |= DescriptorFlags::HAS_IDENTITY_FREE_FIELDS;
                    if decl.can_be_flattened && target.is_flattenable() {
                        flags |= DescriptorFlags::HAS_FLAT_FIELDS;
                        // An inlined payload carries its reference words along.
                        if target.has_references() {
                            flags |= DescriptorFlags::HAS_REFERENCES;
                        }
                        (target.size_bytes(), target.alignment_bytes().max(1), true)
                    } else {
                        flags |= DescriptorFlags::HAS_REFERENCES;
                        (REF_BYTES, REF_BYTES, false)
                    }
                }
            };

            offset = align_up(offset, field_align);
            resolved.push(ResolvedField {
                name: decl.name,
                ty: decl.ty,
                offset_bytes: offset,
                inlined,
            });
            offset += size;
            align = align.max(field_align);
        }

        if resolved.is_empty() {
            flags |= DescriptorFlags::IS_EMPTY;
        }

        Ok(ResolvedLayout {
            fields: resolved,
            size_bytes: align_up(offset, align),
            align_bytes: align,
            flags,
        })
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Intermediate result of field resolution.
struct ResolvedLayout {
    fields: Vec<ResolvedField>,
    size_bytes: u32,
    align_bytes: u32,
    flags: DescriptorFlags,
}

#[inline]
fn align_up(offset: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two());
    (offset + align - 1) & !(align - 1)
}

/// Byte offsets of every reference word within one payload.
///
/// Enumerates reference-typed fields recursively through inlined value
/// fields, so the collector can trace a flattened slot without boxing it.
/// Offsets are relative to the start of the payload; the null marker (if
/// any) is never a reference.
pub fn reference_offsets(table: &DescriptorTable, id: DescriptorId) -> Vec<u32> {
    let mut offsets = Vec::new();
    collect_reference_offsets(table, id, 0, &mut offsets);
    offsets
}

fn collect_reference_offsets(
    table: &DescriptorTable,
    id: DescriptorId,
    base: u32,
    out: &mut Vec<u32>,
) {
    let descriptor = table.get(id);
    if !descriptor.has_references() {
        return;
    }
    for field in descriptor.fields() {
        match field.ty {
            FieldType::Prim(_) => {}
            FieldType::Reference => out.push(base + field.offset_bytes),
            FieldType::Value(inner) if field.inlined => {
                collect_reference_offsets(table, inner, base + field.offset_bytes, out);
            }
            // A non-inlined value field is stored as a reference word.
            FieldType::Value(_) => out.push(base + field.offset_bytes),
        }
    }
}
