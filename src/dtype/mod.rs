//! Data type system shared by every backend
//!
//! This module provides the `DType` enum naming every element type a unified
//! array can carry, the `DTypeSet` bitset used by the unsupported-dtype
//! tables, and the promotion lattice that decides the common dtype of mixed
//! operands.

mod dispatch;
mod element;
pub mod promotion;

pub use element::Element;
pub use promotion::{PromotionMode, PromotionTable, can_cast_safely, promote, promote_all};

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Element types understood by the unified array API
///
/// Discriminants are grouped by tens: floats in `0..10`, signed integers in
/// `10..20`, unsigned integers in `20..30` and `bool` at 30. [`DType::kind`]
/// reads the group straight off the discriminant, so new variants must keep
/// to their group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DType {
    /// 64-bit floating point
    F64 = 0,
    /// 32-bit floating point
    F32 = 1,
    /// IEEE 754 half precision
    F16 = 2,
    /// bfloat16, the truncated-mantissa half float
    BF16 = 3,

    /// 64-bit signed integer
    I64 = 10,
    /// 32-bit signed integer
    I32 = 11,
    /// 16-bit signed integer
    I16 = 12,
    /// 8-bit signed integer
    I8 = 13,

    /// 64-bit unsigned integer
    U64 = 20,
    /// 32-bit unsigned integer
    U32 = 21,
    /// 16-bit unsigned integer
    U16 = 22,
    /// 8-bit unsigned integer
    U8 = 23,

    /// Boolean, stored as one byte
    Bool = 30,
}

impl DType {
    /// Every dtype, in dense-index order
    pub const ALL: [DType; 13] = [
        Self::F64,
        Self::F32,
        Self::F16,
        Self::BF16,
        Self::I64,
        Self::I32,
        Self::I16,
        Self::I8,
        Self::U64,
        Self::U32,
        Self::U16,
        Self::U8,
        Self::Bool,
    ];

    /// Dense position in [`DType::ALL`], used to index lookup tables
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::F64 => 0,
            Self::F32 => 1,
            Self::F16 => 2,
            Self::BF16 => 3,
            Self::I64 => 4,
            Self::I32 => 5,
            Self::I16 => 6,
            Self::I8 => 7,
            Self::U64 => 8,
            Self::U32 => 9,
            Self::U16 => 10,
            Self::U8 => 11,
            Self::Bool => 12,
        }
    }

    /// Storage width of one element
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::F64 | Self::I64 | Self::U64 => 8,
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::F16 | Self::BF16 | Self::I16 | Self::U16 => 2,
            Self::I8 | Self::U8 | Self::Bool => 1,
        }
    }

    /// Category this dtype belongs to
    #[inline]
    pub const fn kind(self) -> DTypeKind {
        match self as u8 / 10 {
            0 => DTypeKind::Float,
            1 => DTypeKind::SignedInt,
            2 => DTypeKind::UnsignedInt,
            _ => DTypeKind::Bool,
        }
    }

    /// Whether values of this dtype are floating point
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self.kind(), DTypeKind::Float)
    }

    /// Whether values of this dtype are integers of either signedness
    #[inline]
    pub const fn is_int(self) -> bool {
        matches!(self.kind(), DTypeKind::SignedInt | DTypeKind::UnsignedInt)
    }

    /// Float dtype used when an integer result has to become fractional
    #[inline]
    pub const fn default_float() -> Self {
        Self::F32
    }

    /// Integer dtype of index results and integer scalars
    #[inline]
    pub const fn default_int() -> Self {
        Self::I64
    }

    /// Short name for display (e.g., "f32", "i64")
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::BF16 => "bf16",
            Self::I64 => "i64",
            Self::I32 => "i32",
            Self::I16 => "i16",
            Self::I8 => "i8",
            Self::U64 => "u64",
            Self::U32 => "u32",
            Self::U16 => "u16",
            Self::U8 => "u8",
            Self::Bool => "bool",
        }
    }

    /// Long name as used by array-API libraries (e.g., "float32")
    pub const fn long_name(self) -> &'static str {
        match self {
            Self::F64 => "float64",
            Self::F32 => "float32",
            Self::F16 => "float16",
            Self::BF16 => "bfloat16",
            Self::I64 => "int64",
            Self::I32 => "int32",
            Self::I16 => "int16",
            Self::I8 => "int8",
            Self::U64 => "uint64",
            Self::U32 => "uint32",
            Self::U16 => "uint16",
            Self::U8 => "uint8",
            Self::Bool => "bool",
        }
    }

    /// Inclusive range of an integer or bool dtype, `None` for floats
    fn int_bounds(self) -> Option<(f64, f64)> {
        let bounds = match self {
            Self::I64 => (i64::MIN as f64, i64::MAX as f64),
            Self::I32 => (i32::MIN as f64, i32::MAX as f64),
            Self::I16 => (i16::MIN as f64, i16::MAX as f64),
            Self::I8 => (i8::MIN as f64, i8::MAX as f64),
            Self::U64 => (0.0, u64::MAX as f64),
            Self::U32 => (0.0, u32::MAX as f64),
            Self::U16 => (0.0, u16::MAX as f64),
            Self::U8 => (0.0, u8::MAX as f64),
            Self::Bool => (0.0, 1.0),
            Self::F64 | Self::F32 | Self::F16 | Self::BF16 => return None,
        };
        Some(bounds)
    }

    /// Round an f64 to the nearest value this dtype can hold.
    ///
    /// Integers truncate toward zero and saturate at the type bounds, bools
    /// map any nonzero value to 1, and narrow floats round through their
    /// storage format.
    pub fn quantize(self, v: f64) -> f64 {
        match self {
            Self::F64 => v,
            Self::F32 => v as f32 as f64,
            Self::F16 => half::f16::from_f64(v).to_f64(),
            Self::BF16 => half::bf16::from_f64(v).to_f64(),
            Self::Bool => {
                if v != 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            _ => match self.int_bounds() {
                Some(_) if v.is_nan() => 0.0,
                Some((lo, hi)) => v.trunc().clamp(lo, hi),
                None => v,
            },
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        DType::ALL
            .into_iter()
            .find(|d| d.short_name() == lowered || d.long_name() == lowered)
            .ok_or_else(|| Error::invalid_argument("dtype", "name", format!("unknown dtype '{s}'")))
    }
}

/// Broad category of a [`DType`], fixed by the tens digit of its discriminant
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DTypeKind {
    /// `f64`, `f32`, `f16`, `bf16`
    Float,
    /// `i64` down to `i8`
    SignedInt,
    /// `u64` down to `u8`
    UnsignedInt,
    /// `bool`
    Bool,
}

/// Bitset of dtypes, keyed by discriminant
///
/// Unsupported-dtype rules store one of these per operation and version range.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DTypeSet {
    bits: u64,
}

impl DTypeSet {
    /// No dtypes
    pub const EMPTY: Self = Self { bits: 0 };

    /// Every float dtype
    pub const FLOATS: Self = Self::of(&[DType::F64, DType::F32, DType::F16, DType::BF16]);

    /// `f16` and `bf16`
    pub const HALF_FLOATS: Self = Self::of(&[DType::F16, DType::BF16]);

    /// Every integer dtype, signed and unsigned
    pub const INTS: Self = Self::of(&[
        DType::I64,
        DType::I32,
        DType::I16,
        DType::I8,
        DType::U64,
        DType::U32,
        DType::U16,
        DType::U8,
    ]);

    #[inline]
    const fn bit(dtype: DType) -> u64 {
        1 << dtype as u8
    }

    /// Set holding exactly `dtype`
    #[inline]
    pub const fn single(dtype: DType) -> Self {
        Self { bits: Self::bit(dtype) }
    }

    /// Set holding every listed dtype
    pub const fn of(dtypes: &[DType]) -> Self {
        let mut bits = 0u64;
        let mut i = 0;
        while i < dtypes.len() {
            bits |= Self::bit(dtypes[i]);
            i += 1;
        }
        Self { bits }
    }

    /// Membership test
    #[inline]
    pub const fn contains(self, dtype: DType) -> bool {
        self.bits & Self::bit(dtype) != 0
    }

    /// Members of either set
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self { bits: self.bits | other.bits }
    }

    /// `true` when no dtype is a member
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Iterate the members in dense-index order
    pub fn iter(self) -> impl Iterator<Item = DType> {
        DType::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_discriminant() {
        let kinds: Vec<_> = DType::ALL.iter().map(|d| d.kind()).collect();
        assert_eq!(kinds.iter().filter(|k| **k == DTypeKind::Float).count(), 4);
        assert_eq!(DType::BF16.kind(), DTypeKind::Float);
        assert_eq!(DType::I8.kind(), DTypeKind::SignedInt);
        assert_eq!(DType::U64.kind(), DTypeKind::UnsignedInt);
        assert_eq!(DType::Bool.kind(), DTypeKind::Bool);
        assert!(!DType::Bool.is_int());
        assert!(DType::U16.is_int() && !DType::U16.is_float());
    }

    #[test]
    fn test_width_matches_element() {
        assert_eq!(DType::F64.size_in_bytes(), std::mem::size_of::<f64>());
        assert_eq!(DType::BF16.size_in_bytes(), std::mem::size_of::<half::bf16>());
        assert_eq!(DType::U32.size_in_bytes(), std::mem::size_of::<u32>());
        assert_eq!(DType::Bool.size_in_bytes(), 1);
    }

    #[test]
    fn test_index_is_dense() {
        for (i, d) in DType::ALL.iter().enumerate() {
            assert_eq!(d.index(), i);
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("f32".parse::<DType>().unwrap(), DType::F32);
        assert_eq!("float32".parse::<DType>().unwrap(), DType::F32);
        assert_eq!("bfloat16".parse::<DType>().unwrap(), DType::BF16);
        assert_eq!("UINT8".parse::<DType>().unwrap(), DType::U8);
        assert!("complex64".parse::<DType>().is_err());
    }

    #[test]
    fn test_quantize() {
        assert_eq!(DType::I8.quantize(300.0), 127.0);
        assert_eq!(DType::U8.quantize(-3.0), 0.0);
        assert_eq!(DType::I32.quantize(2.9), 2.0);
        assert_eq!(DType::I32.quantize(-2.9), -2.0);
        assert_eq!(DType::Bool.quantize(0.5), 1.0);
        assert_eq!(DType::F16.quantize(1.0 / 3.0), half::f16::from_f64(1.0 / 3.0).to_f64());
    }

    #[test]
    fn test_set_membership() {
        for d in DType::ALL {
            assert_eq!(DTypeSet::FLOATS.contains(d), d.is_float(), "{d}");
            assert_eq!(DTypeSet::INTS.contains(d), d.is_int(), "{d}");
        }
        assert!(DTypeSet::EMPTY.is_empty());

        let set = DTypeSet::of(&[DType::U8, DType::I8]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![DType::I8, DType::U8]);
        assert!(set.union(DTypeSet::HALF_FLOATS).contains(DType::BF16));
        assert!(!set.contains(DType::F16));
    }
}
