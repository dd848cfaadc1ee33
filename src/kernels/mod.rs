//! Reference numeric kernels shared by every backend
//!
//! Kernels compute in f64 over row-major [`Dense`] buffers. A backend turns
//! its native operands into `Dense`, calls [`execute`], and turns the
//! [`KernelOutput`] back into natives of the right dtype. Batched matrix
//! kernels run their batches in parallel when the `rayon` feature is enabled.

mod decompositions;
mod dense;
mod elementwise;
mod jacobi;
mod linalg;
mod norms;

pub use dense::Dense;

use crate::dispatch::op::{OpKind, OpSpec};
use crate::value::Value;
use thiserror::Error;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Failure inside a kernel
///
/// The dispatch pipeline wraps these as [`crate::Error::BackendKernel`],
/// except `Shape` and `OutputShape`, which become
/// [`crate::Error::ShapeMismatch`] and [`crate::Error::OutputShapeMismatch`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// Matrix has no inverse
    #[error("matrix is singular")]
    Singular,

    /// Cholesky input is not positive definite
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,

    /// Operand shapes are incompatible
    #[error("incompatible shapes {lhs:?} and {rhs:?}")]
    Shape {
        /// First shape
        lhs: Vec<usize>,
        /// Second shape
        rhs: Vec<usize>,
    },

    /// A square matrix was required
    #[error("expected square matrices, got shape {0:?}")]
    NotSquare(Vec<usize>),

    /// Too few dimensions
    #[error("expected at least {min} dimensions, got {got}")]
    Rank {
        /// Minimum number of dimensions
        min: usize,
        /// Actual number of dimensions
        got: usize,
    },

    /// Result cannot be written into the provided output buffer
    #[error("result of shape {expected:?} does not fit output of shape {got:?}")]
    OutputShape {
        /// Result shape
        expected: Vec<usize>,
        /// Output buffer shape
        got: Vec<usize>,
    },

    /// Any other invalid input
    #[error("{0}")]
    Invalid(String),
}

/// One bound argument as seen by a kernel
#[derive(Clone, Debug)]
pub enum KernelValue {
    /// Tensor operand
    Tensor(Dense),
    /// Scalar or option value
    Scalar(Value),
}

/// Bound arguments of one kernel call, in parameter order
#[derive(Debug)]
pub struct KernelArgs {
    spec: &'static OpSpec,
    values: Vec<KernelValue>,
}

impl KernelArgs {
    /// Bind values to an operation's parameter list
    pub fn new(spec: &'static OpSpec, values: Vec<KernelValue>) -> Result<Self, KernelError> {
        if values.len() != spec.params.len() {
            return Err(KernelError::Invalid(format!(
                "'{}' takes {} arguments, got {}",
                spec.name,
                spec.params.len(),
                values.len()
            )));
        }
        Ok(Self { spec, values })
    }

    fn slot(&self, name: &str) -> Result<&KernelValue, KernelError> {
        self.spec
            .param_index(name)
            .map(|i| &self.values[i])
            .ok_or_else(|| KernelError::Invalid(format!("'{}' has no parameter '{name}'", self.spec.name)))
    }

    fn scalar(&self, name: &str) -> Result<&Value, KernelError> {
        match self.slot(name)? {
            KernelValue::Scalar(v) => Ok(v),
            KernelValue::Tensor(_) => Err(wrong_kind(name, "a scalar")),
        }
    }

    /// Tensor argument
    pub fn tensor(&self, name: &str) -> Result<&Dense, KernelError> {
        match self.slot(name)? {
            KernelValue::Tensor(t) => Ok(t),
            KernelValue::Scalar(_) => Err(wrong_kind(name, "a tensor")),
        }
    }

    /// Tensor argument, promoting a numeric scalar to a 0-d tensor
    pub fn tensor_or_scalar(&self, name: &str) -> Result<Dense, KernelError> {
        match self.slot(name)? {
            KernelValue::Tensor(t) => Ok(t.clone()),
            KernelValue::Scalar(v) => v
                .as_f64()
                .or(match v {
                    Value::Bool(b) => Some(f64::from(u8::from(*b))),
                    _ => None,
                })
                .map(Dense::scalar)
                .ok_or_else(|| wrong_kind(name, "a tensor or number")),
        }
    }

    /// Optional operand: tensor, number, sequence of numbers, or none
    pub fn operand(&self, name: &str) -> Result<Option<Dense>, KernelError> {
        match self.slot(name)? {
            KernelValue::Tensor(t) => Ok(Some(t.clone())),
            KernelValue::Scalar(Value::None) => Ok(None),
            KernelValue::Scalar(Value::Seq(items)) => {
                let values = items
                    .iter()
                    .map(|v| v.as_f64().ok_or_else(|| wrong_kind(name, "a sequence of numbers")))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Some(Dense::from_parts([values.len()].into(), values)))
            }
            KernelValue::Scalar(v) => v
                .as_f64()
                .map(|x| Some(Dense::scalar(x)))
                .ok_or_else(|| wrong_kind(name, "a tensor, number or sequence")),
        }
    }

    /// Integer argument
    pub fn int(&self, name: &str) -> Result<i64, KernelError> {
        self.scalar(name)?
            .as_int()
            .ok_or_else(|| wrong_kind(name, "an integer"))
    }

    /// Optional integer argument
    pub fn opt_int(&self, name: &str) -> Result<Option<i64>, KernelError> {
        match self.scalar(name)? {
            Value::None => Ok(None),
            v => v.as_int().map(Some).ok_or_else(|| wrong_kind(name, "an integer")),
        }
    }

    /// Float argument
    pub fn float(&self, name: &str) -> Result<f64, KernelError> {
        self.scalar(name)?
            .as_f64()
            .ok_or_else(|| wrong_kind(name, "a number"))
    }

    /// Optional float argument
    pub fn opt_float(&self, name: &str) -> Result<Option<f64>, KernelError> {
        match self.scalar(name)? {
            Value::None => Ok(None),
            v => v.as_f64().map(Some).ok_or_else(|| wrong_kind(name, "a number")),
        }
    }

    /// Boolean argument
    pub fn flag(&self, name: &str) -> Result<bool, KernelError> {
        match self.scalar(name)? {
            Value::Bool(b) => Ok(*b),
            _ => Err(wrong_kind(name, "a boolean")),
        }
    }

    /// String argument
    pub fn text(&self, name: &str) -> Result<&str, KernelError> {
        match self.scalar(name)? {
            Value::Str(s) => Ok(s),
            _ => Err(wrong_kind(name, "a string")),
        }
    }

    /// One integer or a sequence of integers
    pub fn ints(&self, name: &str) -> Result<Vec<i64>, KernelError> {
        self.opt_ints(name)?
            .ok_or_else(|| wrong_kind(name, "an integer or integer sequence"))
    }

    /// Like [`KernelArgs::ints`], or none
    pub fn opt_ints(&self, name: &str) -> Result<Option<Vec<i64>>, KernelError> {
        match self.scalar(name)? {
            Value::None => Ok(None),
            Value::Int(i) => Ok(Some(vec![*i])),
            Value::Seq(items) => items
                .iter()
                .map(|v| v.as_int().ok_or_else(|| wrong_kind(name, "a sequence of integers")))
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            _ => Err(wrong_kind(name, "an integer or integer sequence")),
        }
    }

    /// Raw scalar value, for arguments with several accepted forms
    pub fn raw(&self, name: &str) -> Result<&Value, KernelError> {
        self.scalar(name)
    }
}

fn wrong_kind(name: &str, expected: &str) -> KernelError {
    KernelError::Invalid(format!("argument '{name}' must be {expected}"))
}

/// Result of a kernel call
#[derive(Clone, Debug)]
pub enum KernelOutput {
    /// Single tensor
    Tensor(Dense),
    /// Named tuple of tensors
    Record {
        /// Record type name
        name: &'static str,
        /// Fields in order
        fields: Vec<(&'static str, Dense)>,
    },
}

/// Run the kernel for `op`
pub fn execute(op: OpKind, args: &KernelArgs) -> Result<KernelOutput, KernelError> {
    use KernelOutput::Tensor;

    let out = match op {
        OpKind::Cholesky => Tensor(decompositions::cholesky(args.tensor("x")?, args.flag("upper")?)?),
        OpKind::Cross => Tensor(linalg::cross(
            args.tensor("x1")?,
            args.tensor("x2")?,
            args.int("axis")?,
        )?),
        OpKind::Det => Tensor(decompositions::det(args.tensor("x")?)?),
        OpKind::Diag => Tensor(linalg::diag(
            args.tensor("x")?,
            args.int("offset")?,
            args.float("padding_value")?,
            args.opt_int("num_rows")?,
            args.opt_int("num_cols")?,
        )?),
        OpKind::Diagonal => Tensor(linalg::diagonal(
            args.tensor("x")?,
            args.int("offset")?,
            args.int("axis1")?,
            args.int("axis2")?,
        )?),
        OpKind::Eigh => {
            let (values, vectors) = decompositions::eigh(args.tensor("x")?, args.text("uplo")?)?;
            KernelOutput::Record {
                name: "eigh",
                fields: vec![("eigenvalues", values), ("eigenvectors", vectors)],
            }
        }
        OpKind::Eigvalsh => Tensor(decompositions::eigh(args.tensor("x")?, args.text("uplo")?)?.0),
        OpKind::Inner => Tensor(linalg::inner(args.tensor("x1")?, args.tensor("x2")?)?),
        OpKind::Inv => Tensor(decompositions::inv(args.tensor("x")?, args.flag("adjoint")?)?),
        OpKind::Matmul => Tensor(linalg::matmul(
            args.tensor("x1")?,
            args.tensor("x2")?,
            args.flag("transpose_a")?,
            args.flag("transpose_b")?,
        )?),
        OpKind::MatrixNorm => Tensor(norms::matrix_norm(
            args.tensor("x")?,
            args.raw("ord")?,
            &args.ints("axis")?,
            args.flag("keepdims")?,
        )?),
        OpKind::MatrixPower => Tensor(decompositions::matrix_power(args.tensor("x")?, args.int("n")?)?),
        OpKind::MatrixRank => Tensor(decompositions::matrix_rank(
            args.tensor("x")?,
            args.opt_float("atol")?,
            args.opt_float("rtol")?,
        )?),
        OpKind::MatrixTranspose => Tensor(args.tensor("x")?.transpose_last2()?),
        OpKind::Outer => Tensor(linalg::outer(args.tensor("x1")?, args.tensor("x2")?)),
        OpKind::Pinv => Tensor(decompositions::pinv(args.tensor("x")?, args.opt_float("rtol")?)?),
        OpKind::Qr => {
            let (q, r) = decompositions::qr(args.tensor("x")?, args.text("mode")?)?;
            KernelOutput::Record {
                name: "qr",
                fields: vec![("Q", q), ("R", r)],
            }
        }
        OpKind::Slogdet => {
            let (sign, logabsdet) = decompositions::slogdet(args.tensor("x")?)?;
            KernelOutput::Record {
                name: "slogdet",
                fields: vec![("sign", sign), ("logabsdet", logabsdet)],
            }
        }
        OpKind::Solve => Tensor(decompositions::solve(
            args.tensor("x1")?,
            args.tensor("x2")?,
            args.flag("adjoint")?,
        )?),
        OpKind::Svd => {
            let full = args.flag("full_matrices")?;
            if args.flag("compute_uv")? {
                let (u, s, vh) = decompositions::svd(args.tensor("x")?, full)?;
                KernelOutput::Record {
                    name: "svd",
                    fields: vec![("U", u), ("S", s), ("Vh", vh)],
                }
            } else {
                KernelOutput::Record {
                    name: "svd",
                    fields: vec![("S", decompositions::svdvals(args.tensor("x")?)?)],
                }
            }
        }
        OpKind::Svdvals => Tensor(decompositions::svdvals(args.tensor("x")?)?),
        OpKind::Tensordot => Tensor(linalg::tensordot(
            args.tensor("x1")?,
            args.tensor("x2")?,
            args.raw("axes")?,
        )?),
        OpKind::Trace => Tensor(linalg::trace(
            args.tensor("x")?,
            args.int("offset")?,
            args.int("axis1")?,
            args.int("axis2")?,
        )?),
        OpKind::Vecdot => Tensor(linalg::vecdot(
            args.tensor("x1")?,
            args.tensor("x2")?,
            args.int("axis")?,
        )?),
        OpKind::VectorNorm => Tensor(norms::vector_norm(
            args.tensor("x")?,
            args.opt_ints("axis")?.as_deref(),
            args.flag("keepdims")?,
            args.raw("ord")?,
        )?),
        OpKind::VectorToSkewSymmetricMatrix => {
            Tensor(linalg::vector_to_skew_symmetric_matrix(args.tensor("vector")?)?)
        }
        OpKind::Vander => Tensor(linalg::vander(
            args.tensor("x")?,
            args.opt_int("N")?,
            args.flag("increasing")?,
        )?),
        OpKind::LayerNorm => Tensor(norms::layer_norm(
            args.tensor("x")?,
            &args.ints("normalized_idxs")?,
            args.operand("weight")?.as_ref(),
            args.operand("bias")?.as_ref(),
            args.float("epsilon")?,
            args.float("new_std")?,
        )?),
        OpKind::Add | OpKind::Subtract | OpKind::Multiply | OpKind::Divide => {
            Tensor(elementwise::binary(
                op,
                &args.tensor_or_scalar("x1")?,
                &args.tensor_or_scalar("x2")?,
            )?)
        }
    };
    Ok(out)
}

/// Run `f` for every batch index, in parallel when `rayon` is enabled
pub(crate) fn map_batches<T, F>(batches: usize, f: F) -> Result<Vec<T>, KernelError>
where
    T: Send,
    F: Fn(usize) -> Result<T, KernelError> + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        if batches > 1 {
            return (0..batches).into_par_iter().map(f).collect();
        }
    }

    (0..batches).map(f).collect()
}

/// Validate the element count of a shape a kernel is about to allocate
pub(crate) fn checked_shape(dims: &[usize]) -> Result<crate::tensor::Shape, KernelError> {
    let shape = crate::tensor::Shape::from(dims);
    match shape.checked_numel() {
        Some(_) => Ok(shape),
        None => Err(KernelError::Invalid(format!(
            "shape {dims:?} holds more elements than fit in memory"
        ))),
    }
}

/// Resolve a possibly negative axis, as a kernel error
pub(crate) fn axis_index(axis: i64, ndim: usize) -> Result<usize, KernelError> {
    let resolved = if axis < 0 { axis + ndim as i64 } else { axis };
    if resolved < 0 || resolved as usize >= ndim {
        return Err(KernelError::Invalid(format!(
            "axis {axis} is out of bounds for {ndim} dimensions"
        )));
    }
    Ok(resolved as usize)
}
