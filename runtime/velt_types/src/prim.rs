//! Primitive field kinds with fixed physical facts.
//!
//! Sizes and alignments are constants of the value model, not of the host:
//! a `Long` is 8 bytes on every target, and slot encodings are
//! little-endian everywhere.

use std::fmt;

/// Primitive kind of a value-object field.
///
/// The set is fixed (not user-extensible), so enum dispatch is preferred
/// over trait objects throughout the runtime.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PrimType {
    /// 1-byte boolean (0 or 1).
    Bool,
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 16-bit unsigned code unit.
    Char,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE float. Stored and compared by raw bits.
    Float,
    /// 64-bit IEEE float. Stored and compared by raw bits.
    Double,
}

impl PrimType {
    /// Payload size in bytes.
    #[inline]
    pub const fn size_bytes(self) -> u32 {
        match self {
            Self::Bool | Self::Byte => 1,
            Self::Short | Self::Char => 2,
            Self::Int | Self::Float => 4,
            Self::Long | Self::Double => 8,
        }
    }

    /// Required alignment in bytes. Primitives are naturally aligned.
    #[inline]
    pub const fn align_bytes(self) -> u32 {
        self.size_bytes()
    }

    /// Human-readable name for diagnostics.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Char => "char",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }
}

impl fmt::Display for PrimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_natural() {
        assert_eq!(PrimType::Bool.size_bytes(), 1);
        assert_eq!(PrimType::Byte.size_bytes(), 1);
        assert_eq!(PrimType::Short.size_bytes(), 2);
        assert_eq!(PrimType::Char.size_bytes(), 2);
        assert_eq!(PrimType::Int.size_bytes(), 4);
        assert_eq!(PrimType::Float.size_bytes(), 4);
        assert_eq!(PrimType::Long.size_bytes(), 8);
        assert_eq!(PrimType::Double.size_bytes(), 8);
    }

    #[test]
    fn alignment_matches_size() {
        for p in [
            PrimType::Bool,
            PrimType::Byte,
            PrimType::Short,
            PrimType::Char,
            PrimType::Int,
            PrimType::Long,
            PrimType::Float,
            PrimType::Double,
        ] {
            assert_eq!(p.align_bytes(), p.size_bytes());
        }
    }
}
