//! Type promotion rules for mixed-dtype operands
//!
//! Promotion is the least upper bound in a partial order over dtypes. Each
//! rule set lists the direct "safely widens to" edges; the table stores, for
//! every pair, the unique smallest dtype both operands widen to. Because it is
//! a join, the result is commutative and associative by construction, and a
//! pair with no unique bound simply has no entry.

use super::DType;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

const N: usize = DType::ALL.len();

/// Which rule set drives promotion
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PromotionMode {
    /// Array-API rules plus bool/int/float cross-kind promotion
    #[default]
    Extended,
    /// Strict array-API rules: promotion only within a kind, no `u64`/`i64` mixing
    ArrayApi,
}

impl fmt::Display for PromotionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extended => write!(f, "extended"),
            Self::ArrayApi => write!(f, "array_api"),
        }
    }
}

impl FromStr for PromotionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extended" | "default" => Ok(Self::Extended),
            "array_api" | "array-api" | "strict" => Ok(Self::ArrayApi),
            other => Err(Error::InvalidConfig {
                key: "promotion",
                reason: format!("unknown promotion mode '{other}'"),
            }),
        }
    }
}

use DType::*;

/// Direct widening edges shared by both rule sets
const INTEGER_AND_FLOAT_EDGES: &[(DType, DType)] = &[
    (U8, U16),
    (U16, U32),
    (U32, U64),
    (I8, I16),
    (I16, I32),
    (I32, I64),
    (U8, I16),
    (U16, I32),
    (U32, I64),
    (F16, F32),
    (BF16, F32),
    (F32, F64),
];

/// Cross-kind edges added by the extended rule set.
///
/// Each integer has a float ceiling: `i8, u8, i16 -> f16`, `u16, i32 -> f32`,
/// `u32, i64, u64 -> f64`. Bool sits below the smallest of every kind.
const CROSS_KIND_EDGES: &[(DType, DType)] = &[
    (Bool, U8),
    (Bool, I8),
    (Bool, BF16),
    (I8, F16),
    (I16, F16),
    (U16, F32),
    (I32, F32),
    (U32, F64),
    (I64, F64),
    (U64, F64),
];

/// Precomputed symmetric promotion table for one rule set
#[derive(Clone, Debug)]
pub struct PromotionTable {
    mode: PromotionMode,
    /// Bitmask of every dtype each dtype widens to (itself included)
    upper: [u16; N],
    joins: [[Option<DType>; N]; N],
}

impl PromotionTable {
    /// Build the table for a rule set
    pub fn new(mode: PromotionMode) -> Self {
        let mut edges: Vec<(DType, DType)> = INTEGER_AND_FLOAT_EDGES.to_vec();
        if mode == PromotionMode::Extended {
            edges.extend_from_slice(CROSS_KIND_EDGES);
        }

        // Reflexive-transitive closure of the edge list
        let mut upper = [0u16; N];
        for d in DType::ALL {
            upper[d.index()] = 1 << d.index();
        }
        let mut changed = true;
        while changed {
            changed = false;
            for &(lo, hi) in &edges {
                for d in DType::ALL {
                    let set = upper[d.index()];
                    if set & (1 << lo.index()) != 0 {
                        let widened = set | upper[hi.index()];
                        if widened != set {
                            upper[d.index()] = widened;
                            changed = true;
                        }
                    }
                }
            }
        }

        let mut joins = [[None; N]; N];
        for a in DType::ALL {
            for b in DType::ALL {
                let common = upper[a.index()] & upper[b.index()];
                joins[a.index()][b.index()] = DType::ALL.into_iter().find(|c| {
                    common & (1 << c.index()) != 0 && upper[c.index()] & common == common
                });
            }
        }

        Self { mode, upper, joins }
    }

    /// Shared table for a rule set
    pub fn for_mode(mode: PromotionMode) -> &'static Self {
        static EXTENDED: OnceLock<PromotionTable> = OnceLock::new();
        static ARRAY_API: OnceLock<PromotionTable> = OnceLock::new();
        match mode {
            PromotionMode::Extended => EXTENDED.get_or_init(|| Self::new(mode)),
            PromotionMode::ArrayApi => ARRAY_API.get_or_init(|| Self::new(mode)),
        }
    }

    /// Rule set this table was built from
    pub fn mode(&self) -> PromotionMode {
        self.mode
    }

    /// Common dtype of two operands
    pub fn promote(&self, lhs: DType, rhs: DType) -> Result<DType> {
        self.joins[lhs.index()][rhs.index()].ok_or(Error::UnsupportedPromotion { lhs, rhs })
    }

    /// Common dtype of any number of operands, folded pairwise
    pub fn promote_all(&self, dtypes: &[DType]) -> Result<DType> {
        let (&first, rest) = dtypes
            .split_first()
            .ok_or_else(|| Error::invalid_argument("promote_all", "dtypes", "empty dtype list"))?;
        rest.iter().try_fold(first, |acc, &d| self.promote(acc, d))
    }

    /// Whether `from` widens to `to` under this rule set
    pub fn can_cast_safely(&self, from: DType, to: DType) -> bool {
        self.upper[from.index()] & (1 << to.index()) != 0
    }
}

/// Promote two dtypes under the extended rules
pub fn promote(lhs: DType, rhs: DType) -> Result<DType> {
    PromotionTable::for_mode(PromotionMode::Extended).promote(lhs, rhs)
}

/// Promote a list of dtypes under the extended rules
pub fn promote_all(dtypes: &[DType]) -> Result<DType> {
    PromotionTable::for_mode(PromotionMode::Extended).promote_all(dtypes)
}

/// Check if a dtype can be cast to another without data loss
pub fn can_cast_safely(from: DType, to: DType) -> bool {
    PromotionTable::for_mode(PromotionMode::Extended).can_cast_safely(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_type() {
        for d in DType::ALL {
            assert_eq!(promote(d, d).unwrap(), d);
        }
    }

    #[test]
    fn test_float_wins() {
        assert_eq!(promote(F32, I32).unwrap(), F32);
        assert_eq!(promote(I64, F64).unwrap(), F64);
        assert_eq!(promote(U8, F16).unwrap(), F16);
    }

    #[test]
    fn test_larger_wins() {
        assert_eq!(promote(F32, F64).unwrap(), F64);
        assert_eq!(promote(I32, I64).unwrap(), I64);
        assert_eq!(promote(U8, U32).unwrap(), U32);
    }

    #[test]
    fn test_signed_unsigned_mixing() {
        assert_eq!(promote(I8, U8).unwrap(), I16);
        assert_eq!(promote(I16, U16).unwrap(), I32);
        assert_eq!(promote(I32, U32).unwrap(), I64);
        assert_eq!(promote(I64, U64).unwrap(), F64);
    }

    #[test]
    fn test_half_types_meet_at_f32() {
        assert_eq!(promote(F16, BF16).unwrap(), F32);
        assert_eq!(promote(Bool, BF16).unwrap(), BF16);
    }

    #[test]
    fn test_array_api_rejects_cross_kind() {
        let table = PromotionTable::for_mode(PromotionMode::ArrayApi);
        assert!(matches!(
            table.promote(I64, U64),
            Err(Error::UnsupportedPromotion { lhs: I64, rhs: U64 })
        ));
        assert!(table.promote(I32, F32).is_err());
        assert!(table.promote(Bool, U8).is_err());
        assert_eq!(table.promote(U8, I8).unwrap(), I16);
        assert_eq!(table.promote(Bool, Bool).unwrap(), Bool);
    }

    #[test]
    fn test_promote_all() {
        assert_eq!(promote_all(&[U8, I8, F16]).unwrap(), F16);
        assert_eq!(promote_all(&[I32]).unwrap(), I32);
        assert!(promote_all(&[]).is_err());
    }

    #[test]
    fn test_can_cast_safely() {
        assert!(can_cast_safely(I8, I16));
        assert!(can_cast_safely(U8, F32));
        assert!(can_cast_safely(Bool, I64));
        assert!(!can_cast_safely(I64, I32));
        assert!(!can_cast_safely(F32, I32));
        assert!(!can_cast_safely(U64, I64));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("array_api".parse::<PromotionMode>().unwrap(), PromotionMode::ArrayApi);
        assert_eq!("Extended".parse::<PromotionMode>().unwrap(), PromotionMode::Extended);
        assert!("loose".parse::<PromotionMode>().is_err());
    }
}
