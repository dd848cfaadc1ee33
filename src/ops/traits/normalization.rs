//! Normalization operations trait.

use super::{Dispatch, finish};
use crate::dispatch::OpKind;
use crate::error::Result;
use crate::ops::{LayerNormOptions, Operand};

/// Normalization operations
pub trait NormalizationOps: Dispatch {
    /// Layer normalization over the axes in `normalized_idxs`:
    /// `(x - mean) / sqrt(var + epsilon) * new_std * weight + bias`
    ///
    /// Mean and (population) variance are taken jointly over the listed
    /// axes. `weight` and `bias` broadcast against the normalized axes in
    /// the order given.
    ///
    /// With a container input, each leaf is normalized separately; weight
    /// and bias may themselves be containers with the same keys.
    fn layer_norm<T: Operand>(&self, x: &T, normalized_idxs: &[i64], options: LayerNormOptions) -> Result<T> {
        finish(
            OpKind::LayerNorm,
            self.call(OpKind::LayerNorm)
                .arg(x.to_value())
                .arg(normalized_idxs)
                .arg(options.weight)
                .arg(options.bias)
                .arg(options.epsilon)
                .arg(options.new_std),
        )
    }
}
