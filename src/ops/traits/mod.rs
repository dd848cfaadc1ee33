//! Operation traits for the unified surface.
//!
//! Every method builds a [`Call`] against the operation table and runs it
//! through the dispatch pipeline. Implementors only supply
//! [`Dispatch::call`]; the operations themselves are provided methods.

mod binary;
mod linalg;
mod normalization;

pub use binary::BinaryOps;
pub use linalg::LinalgOps;
pub use normalization::NormalizationOps;

use super::Operand;
use crate::dispatch::{Call, OpKind};
use crate::error::Result;
use crate::runtime::Registry;

/// Source of dispatched calls
pub trait Dispatch {
    /// Start a call of `op`
    fn call(&self, op: OpKind) -> Call<'_>;
}

impl Dispatch for Registry {
    fn call(&self, op: OpKind) -> Call<'_> {
        self.op(op)
    }
}

impl LinalgOps for Registry {}
impl NormalizationOps for Registry {}
impl BinaryOps for Registry {}

/// Run `call` and convert the result back to the operand type
fn finish<T: Operand>(op: OpKind, call: Call<'_>) -> Result<T> {
    T::from_value(op.name(), call.run()?)
}
