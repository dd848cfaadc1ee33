//! Backend dispatch
//!
//! Every unified operation is a row in the [`op`] table. A [`Call`] binds
//! arguments against that row and runs them through the operation's
//! [`Pipeline`]:
//!
//! ```text
//! Call::run
//! └── broadcast over containers (KeyPolicy)
//!     └── per leaf: resolve backend -> GuardDtypes -> Promote -> ToNative
//!                   -> Invoke -> Output -> ToUnified -> NormalizeErrors
//! ```

pub mod op;

mod adapter;
mod args;
mod broadcast;
mod out;
mod pipeline;

pub use adapter::{to_native, to_unified};
pub use broadcast::{KeyPolicy, broadcast};
pub use op::{OpKind, OpSpec, Param, ParamDefault, ParamKind, ResultDType};
pub use out::OutPath;
pub use pipeline::{Pipeline, Stage};

pub(crate) use pipeline::normalize;

use crate::error::Result;
use crate::runtime::Registry;
use crate::value::Value;

/// A pending operation call
///
/// Built with [`Registry::op`]; arguments may be given positionally, by
/// keyword, or both. Omitted arguments take their declared defaults.
///
/// ```rust,ignore
/// let y = reg.op(OpKind::MatrixNorm).arg(&x).kwarg("ord", "nuc").run()?;
/// ```
#[derive(Debug)]
#[must_use = "a call does nothing until run"]
pub struct Call<'r> {
    registry: &'r Registry,
    op: OpKind,
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
    out: Option<Value>,
    policy: KeyPolicy,
}

impl<'r> Call<'r> {
    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set an argument by name
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.push((name.into(), value.into()));
        self
    }

    /// Write the result into an existing array (or a container of arrays)
    pub fn out(mut self, buffer: impl Into<Value>) -> Self {
        self.out = Some(buffer.into());
        self
    }

    /// Key matching policy for container broadcasting
    pub fn key_policy(mut self, policy: KeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bind the arguments and dispatch
    pub fn run(self) -> Result<Value> {
        let pipeline = Pipeline::new(self.op);
        let bound = args::bind(pipeline.spec(), self.positional, self.keywords)?;
        let out = self.out.filter(|v| !v.is_none());
        pipeline.run(self.registry, &bound, out.as_ref(), self.policy)
    }
}

impl Registry {
    /// Start a call of `op` dispatched through this registry
    pub fn op(&self, op: OpKind) -> Call<'_> {
        Call {
            registry: self,
            op,
            positional: Vec::new(),
            keywords: Vec::new(),
            out: None,
            policy: KeyPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::runtime::BackendId;

    #[test]
    fn test_call_requires_backend() {
        let reg = Registry::new();
        let err = reg.op(OpKind::Add).arg(1i64).arg(2i64).run().unwrap_err();
        assert!(matches!(err, Error::NoBackendSelected { op: "add" }));
    }

    #[test]
    fn test_scalar_only_call() {
        let reg = Registry::new();
        reg.set_backend(BackendId::Cpu).unwrap();
        let sum = reg.op(OpKind::Add).arg(1i64).kwarg("x2", 2.5).run().unwrap();
        let sum = sum.as_array().unwrap();
        assert_eq!(sum.ndim(), 0);
        assert_eq!(sum.item(), Some(3.5));
    }

    #[test]
    fn test_out_on_record_op_rejected() {
        let reg = Registry::new();
        reg.set_backend(BackendId::Cpu).unwrap();
        let x = reg.array(&[1.0f64, 0.0, 0.0, 1.0], &[2, 2]).unwrap();
        let buf = reg.zeros(&[2, 2], crate::dtype::DType::F64).unwrap();
        let err = reg.op(OpKind::Qr).arg(&x).out(&buf).run().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { ref arg, .. } if arg == "out"));
    }
}
