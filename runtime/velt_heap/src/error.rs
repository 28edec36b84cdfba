//! Storage errors.
//!
//! All three kinds are local, synchronous, and recoverable. A failed
//! operation never corrupts a Layout; the only partial effect anywhere is
//! an interrupted `copy_range`, which leaves already-copied elements in
//! place (documented non-transactional behavior).
//!
//! Factory functions are the public constructors, in the style of the
//! evaluator's error helpers.

use std::fmt;
use velt_types::DescriptorId;

/// Result of a storage operation.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error from an array or field storage operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// Null was stored into (or used to initialize) a null-restricted slot.
    NullRestrictionViolation,
    /// Index outside the container bounds.
    IndexOutOfRange { index: usize, len: usize },
    /// Operands of incompatible value types that the storage layer cannot
    /// reinterpret.
    ClassMismatch {
        expected: DescriptorId,
        found: DescriptorId,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NullRestrictionViolation => {
                write!(f, "null stored into a null-restricted slot")
            }
            StoreError::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            StoreError::ClassMismatch { expected, found } => {
                write!(f, "value type mismatch: expected {expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Null stored into a null-restricted slot.
#[inline]
pub fn null_restriction_violation() -> StoreError {
    StoreError::NullRestrictionViolation
}

/// Index outside the container bounds.
#[inline]
pub fn index_out_of_range(index: usize, len: usize) -> StoreError {
    StoreError::IndexOutOfRange { index, len }
}

/// Value of the wrong type for this container.
#[inline]
pub fn class_mismatch(expected: DescriptorId, found: DescriptorId) -> StoreError {
    StoreError::ClassMismatch { expected, found }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            null_restriction_violation().to_string(),
            "null stored into a null-restricted slot"
        );
        assert_eq!(
            index_out_of_range(5, 3).to_string(),
            "index 5 out of range for length 3"
        );
        let err = class_mismatch(DescriptorId::from_raw(1), DescriptorId::from_raw(2));
        assert_eq!(
            err.to_string(),
            "value type mismatch: expected value-type#1, found value-type#2"
        );
    }
}
