//! Numeric backends and the registry that selects between them
//!
//! A backend owns one native tensor representation and runs the shared
//! [`kernels`](crate::kernels) over it. The dispatch pipeline only talks to
//! backends through the [`Backend`] trait.
//!
//! # Architecture
//!
//! ```text
//! Registry (available backends + active selection stack)
//! └── Backend (identity, version, unsupported-dtype table, native-out flags)
//!     ├── cpu       row-major byte storage, writes `out` buffers natively
//!     └── columnar  column-major f64 storage, no native `out` support
//! ```

pub mod cpu;

#[cfg(feature = "columnar")]
pub mod columnar;

mod registry;
mod unsupported;

pub use registry::{Registry, RegistryConfig, registry};
pub use unsupported::{UnsupportedDtypes, UnsupportedRule, Version, VersionRange};

use crate::dispatch::op::{OpKind, OpSpec, ResultDType};
use crate::dtype::{DType, promote};
use crate::error::{Error, Result};
use crate::kernels::{self, Dense, KernelArgs, KernelError, KernelOutput, KernelValue};
use crate::tensor::NativeArray;
use crate::value::{Record, Value};
use std::fmt;
use std::str::FromStr;

/// Identity of a backend
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendId {
    /// Row-major reference backend
    Cpu,
    /// Column-major backend
    Columnar,
}

impl BackendId {
    /// Registered name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Columnar => "columnar",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "columnar" => Ok(Self::Columnar),
            _ => Err(Error::UnknownBackend(s.to_string())),
        }
    }
}

/// A numeric engine the dispatch pipeline can drive
///
/// Implementations convert between their [`NativeArray`] variant and the
/// kernels' [`Dense`] buffers; everything else (guards, promotion, the `out`
/// protocol) is handled by the pipeline.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Backend identity
    fn id(&self) -> BackendId;

    /// Version used to look up unsupported dtypes
    fn version(&self) -> Version;

    /// Unsupported-dtype table
    fn unsupported(&self) -> &UnsupportedDtypes;

    /// Whether `op` writes into a caller-provided buffer itself
    fn supports_native_out(&self, op: OpKind) -> bool;

    /// Create a native tensor holding `dense` rounded into `dtype`
    fn from_dense(&self, dense: &Dense, dtype: DType) -> NativeArray;

    /// Read a native tensor of this backend
    fn to_dense(&self, native: &NativeArray) -> std::result::Result<Dense, KernelError>;

    /// Copy of `native` converted to `dtype`
    fn cast(&self, native: &NativeArray, dtype: DType) -> std::result::Result<NativeArray, KernelError>;

    /// Overwrite `dst` in place with `src` broadcast to `dst`'s shape,
    /// converted to `dst`'s dtype
    fn assign(&self, dst: &mut NativeArray, src: &Dense) -> std::result::Result<(), KernelError>;

    /// Run the kernel for `spec` over bound arguments (`args` is in parameter
    /// order). With `out`, the result is written into the buffer, which is
    /// also returned.
    fn invoke(
        &self,
        spec: &'static OpSpec,
        args: &[Value],
        out: Option<&mut NativeArray>,
    ) -> std::result::Result<Value, KernelError> {
        run_kernel(self, spec, args, out)
    }
}

/// Dtype of kernel results for one call
fn result_dtype(spec: &OpSpec, args: &[Value]) -> DType {
    let tensor_dtype = spec
        .params
        .iter()
        .zip(args)
        .find_map(|(param, value)| match value {
            Value::Native(n) if param.kind.holds_tensor() => Some(n.dtype()),
            _ => None,
        });
    // Scalars-only calls follow the scalar kinds
    let mut operand = tensor_dtype.unwrap_or_else(|| {
        if args.iter().any(|v| matches!(v, Value::Float(_))) {
            DType::default_float()
        } else {
            DType::default_int()
        }
    });
    // Scalar operands lift the tensor's kind, never its width
    if spec.promotes {
        let scalars = spec
            .params
            .iter()
            .zip(args)
            .filter(|(param, _)| param.kind.holds_tensor())
            .map(|(_, value)| value);
        for scalar in scalars {
            operand = match scalar {
                Value::Float(_) if !operand.is_float() => {
                    promote(operand, DType::default_float()).unwrap_or(DType::default_float())
                }
                Value::Int(_) if operand == DType::Bool => DType::default_int(),
                _ => operand,
            };
        }
    }
    let negative = match spec.result {
        ResultDType::FloatIfNegative(name) => spec
            .param_index(name)
            .and_then(|i| args.get(i))
            .and_then(Value::as_int)
            .is_some_and(|n| n < 0),
        _ => false,
    };
    spec.result.resolve(operand, negative)
}

/// Shared kernel path: natives to [`Dense`], run, results back to natives
pub(crate) fn run_kernel<B: Backend + ?Sized>(
    backend: &B,
    spec: &'static OpSpec,
    args: &[Value],
    out: Option<&mut NativeArray>,
) -> std::result::Result<Value, KernelError> {
    let values = args
        .iter()
        .map(|value| match value {
            Value::Native(native) => backend.to_dense(native).map(KernelValue::Tensor),
            other => Ok(KernelValue::Scalar(other.clone())),
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let dtype = result_dtype(spec, args);

    log::trace!("{} kernel '{}' -> {}", backend.id(), spec.name, dtype);
    match kernels::execute(spec.kind, &KernelArgs::new(spec, values)?)? {
        KernelOutput::Tensor(dense) => match out {
            Some(buffer) => {
                backend.assign(buffer, &dense)?;
                Ok(Value::Native(buffer.clone()))
            }
            None => Ok(Value::Native(backend.from_dense(&dense, dtype))),
        },
        KernelOutput::Record { name, fields } => {
            if out.is_some() {
                return Err(KernelError::Invalid(format!(
                    "'{}' returns a record and cannot write into an output buffer",
                    spec.name
                )));
            }
            let fields = fields
                .into_iter()
                .map(|(field, dense)| (field, Value::Native(backend.from_dense(&dense, dtype))))
                .collect();
            Ok(Value::Record(Record::new(name, fields)))
        }
    }
}

/// Broadcast `src` into `dst_shape`, reporting an output-shape failure
pub(crate) fn fit_output(src: &Dense, dst_shape: &[usize]) -> std::result::Result<Dense, KernelError> {
    src.broadcast_to(dst_shape).map_err(|_| KernelError::OutputShape {
        expected: src.shape().to_vec(),
        got: dst_shape.to_vec(),
    })
}

/// Native of another backend reached this one
pub(crate) fn foreign(expected: BackendId, native: &NativeArray) -> KernelError {
    KernelError::Invalid(format!(
        "{expected} backend received a {} tensor",
        native.backend()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_id_names() {
        assert_eq!("CPU".parse::<BackendId>().unwrap(), BackendId::Cpu);
        assert_eq!(BackendId::Columnar.to_string(), "columnar");
        assert!(matches!(
            "jax".parse::<BackendId>(),
            Err(Error::UnknownBackend(name)) if name == "jax"
        ));
    }

    #[test]
    fn test_result_dtype_rules() {
        let native = Value::Native(NativeArray::Cpu(
            cpu::CpuTensor::from_slice(&[1i32, 2], &[2]).unwrap(),
        ));
        let det = OpKind::Det.spec();
        assert_eq!(result_dtype(det, &[native.clone()]), DType::F32);

        let power = OpKind::MatrixPower.spec();
        assert_eq!(result_dtype(power, &[native.clone(), Value::Int(2)]), DType::I32);
        assert_eq!(result_dtype(power, &[native, Value::Int(-1)]), DType::F32);

        let add = OpKind::Add.spec();
        assert_eq!(result_dtype(add, &[Value::Int(1), Value::Int(2)]), DType::I64);
        assert_eq!(result_dtype(add, &[Value::Int(1), Value::Float(2.0)]), DType::F32);
    }

    #[test]
    fn test_scalar_operands_lift_kind() {
        let native = |values: &[f64], dtype: DType| {
            Value::Native(NativeArray::Cpu(
                cpu::CpuTensor::from_f64(values, &[values.len()], dtype).unwrap(),
            ))
        };
        let add = OpKind::Add.spec();
        let ints = native(&[1.0, 2.0], DType::I32);
        assert_eq!(result_dtype(add, &[ints.clone(), Value::Float(2.5)]), DType::F32);
        assert_eq!(result_dtype(add, &[Value::Float(2.5), ints.clone()]), DType::F32);
        assert_eq!(result_dtype(add, &[ints, Value::Int(7)]), DType::I32);

        let wide = native(&[1.0], DType::I64);
        assert_eq!(result_dtype(add, &[wide, Value::Float(0.5)]), DType::F64);

        let flags = native(&[1.0, 0.0], DType::Bool);
        assert_eq!(result_dtype(add, &[flags, Value::Int(3)]), DType::I64);

        let halves = native(&[1.0], DType::F16);
        assert_eq!(result_dtype(add, &[halves, Value::Float(0.5)]), DType::F16);
    }
}
