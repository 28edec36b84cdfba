//! Value descriptors and layout resolution for the Velt runtime.
//!
//! Value objects are identity-free composites: their equality is defined by
//! field contents, and the runtime is free to choose their physical
//! representation per allocation site. This crate owns the static half of
//! that decision:
//!
//! - [`ValueDescriptor`]: per-type physical facts (fields, offsets, size,
//!   alignment, flattenability), computed once at registration and never
//!   re-derived at use sites.
//! - [`Layout`]: the per-`(type, context)` placement decision (boxed or
//!   flattened, atomic or non-atomic, null-restricted or nullable) plus
//!   the slot footprint.
//! - [`resolve`]: the pure, deterministic resolution function, and
//!   [`LayoutCache`], its racy-but-idempotent global memo.
//!
//! Storage containers (`velt_heap`) consult a resolved `Layout`; the
//! substitutability engine (`velt_eq`) consults descriptors directly.

mod descriptor;
mod layout;
mod prim;
mod resolver;

pub use descriptor::{
    reference_offsets, DescriptorError, DescriptorFlags, DescriptorId, DescriptorTable, FieldDecl,
    FieldType, ResolvedField, ValueDescriptor,
};
pub use layout::{Layout, LayoutKind, LayoutPolicy, NullPolicy, Placement, ATOMIC_UNIT_BYTES};
pub use prim::PrimType;
pub use resolver::{is_flattenable, resolve, LayoutCache};

// Size assertions to prevent accidental regressions.
// Layout is copied into every container and every cache entry.
#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::{DescriptorId, Layout};

    const _: () = assert!(std::mem::size_of::<DescriptorId>() == 4);
    const _: () = assert!(std::mem::size_of::<Layout>() <= 32);
}
