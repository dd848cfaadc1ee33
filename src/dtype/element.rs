//! Rust element types and the dtype each one stores as

use super::DType;
use bytemuck::Pod;

/// A Rust scalar type that can fill a unified array
///
/// Implemented for the primitive numerics plus `half::f16` and `half::bf16`.
/// `bool` has no `Pod` layout, so boolean arrays are built from `u8` data with
/// an explicit [`DType::Bool`].
///
/// Values cross the backend boundary as `f64`; `from_f64` truncates and
/// saturates into integer types.
pub trait Element: Pod + Send + Sync + 'static {
    /// Dtype an array of this type reports
    const DTYPE: DType;

    /// Widen to `f64`
    fn to_f64(self) -> f64;

    /// Narrow from `f64`
    fn from_f64(v: f64) -> Self;
}

macro_rules! impl_element {
    (@impl $t:ty => $dtype:ident, $widen:expr, $narrow:expr) => {
        impl Element for $t {
            const DTYPE: DType = DType::$dtype;

            #[inline]
            fn to_f64(self) -> f64 {
                ($widen)(self)
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                ($narrow)(v)
            }
        }
    };
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(impl_element!(@impl $t => $dtype, |x: $t| x as f64, |v: f64| v as $t);)*
    };
}

impl_element!(f64 => F64, f32 => F32, i64 => I64, i32 => I32, i16 => I16, i8 => I8);
impl_element!(u64 => U64, u32 => U32, u16 => U16, u8 => U8);
impl_element!(@impl half::f16 => F16, half::f16::to_f64, half::f16::from_f64);
impl_element!(@impl half::bf16 => BF16, half::bf16::to_f64, half::bf16::from_f64);
