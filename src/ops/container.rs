//! Operations called on containers

use super::{LayerNormOptions, NormalizationOps};
use crate::dispatch::{Call, OpKind};
use crate::error::Result;
use crate::runtime::Registry;
use crate::value::Container;

impl Container {
    /// Layer-normalize every leaf; see [`NormalizationOps::layer_norm`]
    pub fn layer_norm(&self, registry: &Registry, normalized_idxs: &[i64], options: LayerNormOptions) -> Result<Container> {
        registry.layer_norm(self, normalized_idxs, options)
    }

    /// Start a call of `op` with this container as the first argument.
    ///
    /// The call broadcasts over the container like any other; further
    /// arguments, `out` and the key policy are added on the returned builder.
    ///
    /// ```rust,ignore
    /// let dets = params.apply(&reg, OpKind::Det).run()?;
    /// let factors = params.apply(&reg, OpKind::Qr).kwarg("mode", "complete").run()?;
    /// ```
    pub fn apply<'r>(&self, registry: &'r Registry, op: OpKind) -> Call<'r> {
        registry.op(op).arg(self.clone())
    }
}
