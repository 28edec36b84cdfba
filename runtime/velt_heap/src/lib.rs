//! Value-object storage for the Velt runtime.
//!
//! Containers (arrays and object fields) hold identity-free value objects
//! under one fixed [`velt_types::Layout`] per slot. This crate implements
//! the physical side of that contract:
//!
//! - [`ValueInstance`]: the decoded, in-register form of a value object.
//! - [`Heap`]: the process-scoped object heap backing boxed layouts and
//!   identity objects.
//! - `codec`: field packing and the null marker for nullable flat slots.
//! - `slot`: the atomic access controller; no read ever observes a torn
//!   mix of two writes on an atomic layout.
//! - [`ValArray`] / [`ValField`] and [`copy_range`]: the caller-visible
//!   storage operations, with bounds and null-restriction checking.
//!
//! Errors are local and recoverable ([`StoreError`]); nothing in this
//! crate blocks beyond one slot's bounded seqlock retry.

mod array;
pub mod codec;
mod error;
mod heap;
mod slot;
mod value;

pub use array::{copy_range, StoreCtx, ValArray, ValField};
pub use error::{
    class_mismatch, index_out_of_range, null_restriction_violation, StoreError, StoreResult,
};
pub use heap::{Heap, HeapObject, ObjRef};
pub use value::{FieldValue, ValueInstance};
