//! Per-operation dispatch pipeline
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s assembled from the flags
//! of one [`OpSpec`]. Each leaf call (after container broadcasting) walks the
//! stages in order. Kernel failures are held back until
//! [`Stage::NormalizeErrors`] turns them into [`Error`]s; every other stage
//! fails immediately.

use super::broadcast::{KeyPolicy, broadcast};
use super::op::{OpKind, OpSpec};
use super::out::OutPath;
use super::{adapter, args, out};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::kernels::KernelError;
use crate::runtime::{Backend, BackendId, Registry};
use crate::tensor::Array;
use crate::value::Value;

/// One step of a dispatched call
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Reject dtypes the backend lists as unsupported for the operation
    GuardDtypes,
    /// Cast tensor operands to their common dtype
    Promote,
    /// Convert unified arrays into backend natives
    ToNative,
    /// Run the backend kernel
    Invoke,
    /// Fill the `out` buffer
    Output,
    /// Wrap native results in unified handles
    ToUnified,
    /// Turn kernel failures into [`Error`]s
    NormalizeErrors,
}

/// Ordered stages for one operation
#[derive(Clone, Debug)]
pub struct Pipeline {
    spec: &'static OpSpec,
    stages: Vec<Stage>,
}

/// State threaded through the stages of one leaf call
struct LeafCall<'a> {
    backend: &'a dyn Backend,
    args: Vec<Value>,
    buffer: Option<Array>,
    wrote_out: bool,
    result: Option<Value>,
    failure: Option<KernelError>,
}

impl Pipeline {
    /// Pipeline for `op`, built from its declared flags
    pub fn new(op: OpKind) -> Self {
        let spec = op.spec();
        let mut stages = vec![Stage::GuardDtypes];
        if spec.promotes {
            stages.push(Stage::Promote);
        }
        stages.extend([Stage::ToNative, Stage::Invoke]);
        if spec.out {
            stages.push(Stage::Output);
        }
        stages.extend([Stage::ToUnified, Stage::NormalizeErrors]);
        Self { spec, stages }
    }

    /// Operation this pipeline runs
    pub fn spec(&self) -> &'static OpSpec {
        self.spec
    }

    /// Stages in execution order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run over bound arguments (one per declared parameter), broadcasting
    /// over containers.
    pub fn run(&self, registry: &Registry, args: &[Value], out: Option<&Value>, policy: KeyPolicy) -> Result<Value> {
        if !self.spec.nestable && (args.iter().any(Value::is_container) || out.is_some_and(Value::is_container)) {
            return Err(Error::invalid_argument(
                self.spec.name,
                "args",
                "operation cannot be broadcast over containers",
            ));
        }
        broadcast(args, out, policy, &mut |leaf_args, leaf_out| {
            self.run_leaf(registry, leaf_args, leaf_out)
        })
    }

    /// Run one leaf call: no argument is a container
    pub fn run_leaf(&self, registry: &Registry, args: &[Value], out: Option<&Value>) -> Result<Value> {
        args::check_kinds(self.spec, args)?;

        let mut origins: Vec<&Value> = args.iter().collect();
        origins.extend(out);
        let backend = registry.resolve_backend_for(self.spec.name, &origins)?;
        let buffer = out::buffer(self.spec, out, backend.id())?;
        log::trace!(
            "dispatch '{}' on {} (out: {})",
            self.spec.name,
            backend.id(),
            buffer.is_some()
        );

        let mut call = LeafCall {
            backend: backend.as_ref(),
            args: args.to_vec(),
            buffer,
            wrote_out: false,
            result: None,
            failure: None,
        };
        for &stage in &self.stages {
            if call.failure.is_some() && stage != Stage::NormalizeErrors {
                continue;
            }
            self.run_stage(stage, registry, &mut call)?;
        }
        call.result.ok_or_else(|| Error::NotImplemented {
            op: self.spec.name,
            backend: backend.id(),
        })
    }

    fn run_stage(&self, stage: Stage, registry: &Registry, call: &mut LeafCall<'_>) -> Result<()> {
        let backend = call.backend;
        match stage {
            Stage::GuardDtypes => {
                for dtype in tensor_dtypes(self.spec, &call.args) {
                    self.guard(backend, dtype)?;
                }
            }
            Stage::Promote => {
                let dtypes = tensor_dtypes(self.spec, &call.args);
                if dtypes.len() < 2 {
                    return Ok(());
                }
                let target = registry.promotion_table().promote_all(&dtypes)?;
                self.guard(backend, target)?;
                if let Err(e) = self.cast_operands(call, target) {
                    call.failure = Some(e);
                }
            }
            Stage::ToNative => {
                let id = backend.id();
                call.args = call
                    .args
                    .iter()
                    .map(|v| adapter::to_native(v, id))
                    .collect::<Result<_>>()?;
            }
            Stage::Invoke => {
                let outcome = match &call.buffer {
                    Some(buffer) if OutPath::for_backend(backend, self.spec.kind) == OutPath::Native => {
                        call.wrote_out = true;
                        out::write_native(backend, self.spec, &call.args, buffer)
                    }
                    _ => backend.invoke(self.spec, &call.args, None),
                };
                match outcome {
                    Ok(value) => call.result = Some(value),
                    Err(e) => call.failure = Some(e),
                }
            }
            Stage::Output => {
                let written = match (&call.buffer, &call.result) {
                    (Some(buffer), Some(result)) if !call.wrote_out => {
                        Some(out::write_emulated(backend, self.spec, result, buffer))
                    }
                    _ => None,
                };
                match written {
                    Some(Ok(value)) => call.result = Some(value),
                    Some(Err(e)) => call.failure = Some(e),
                    None => {}
                }
            }
            Stage::ToUnified => {
                call.result = call.result.take().map(adapter::to_unified);
            }
            Stage::NormalizeErrors => {
                if let Some(failure) = call.failure.take() {
                    return Err(normalize(failure, backend.id(), self.spec.name));
                }
            }
        }
        Ok(())
    }

    fn guard(&self, backend: &dyn Backend, dtype: DType) -> Result<()> {
        let version = backend.version();
        if backend.unsupported().is_unsupported(self.spec.kind, version, dtype) {
            return Err(Error::UnsupportedDType {
                dtype,
                op: self.spec.name,
                backend: backend.id(),
                version: version.to_string(),
            });
        }
        Ok(())
    }

    fn cast_operands(&self, call: &mut LeafCall<'_>, target: DType) -> std::result::Result<(), KernelError> {
        for (param, value) in self.spec.params.iter().zip(call.args.iter_mut()) {
            if !param.kind.holds_tensor() {
                continue;
            }
            let native = match value {
                Value::Array(a) if a.dtype() != target => a.native(),
                Value::Native(n) if n.dtype() != target => n.clone(),
                _ => continue,
            };
            *value = Value::Native(call.backend.cast(&native, target)?);
        }
        Ok(())
    }
}

/// Dtypes of the tensor operands among bound arguments
fn tensor_dtypes(spec: &OpSpec, args: &[Value]) -> Vec<DType> {
    spec.params
        .iter()
        .zip(args)
        .filter(|(param, _)| param.kind.holds_tensor())
        .filter_map(|(_, value)| match value {
            Value::Array(a) => Some(a.dtype()),
            Value::Native(n) => Some(n.dtype()),
            _ => None,
        })
        .collect()
}

/// Map a kernel failure into the error taxonomy
pub(crate) fn normalize(failure: KernelError, backend: BackendId, op: &'static str) -> Error {
    match failure {
        KernelError::OutputShape { expected, got } => Error::OutputShapeMismatch { expected, got },
        KernelError::Shape { lhs, rhs } => Error::ShapeMismatch { lhs, rhs },
        source => Error::BackendKernel { backend, op, source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::args::bind;
    use crate::runtime::cpu::CpuTensor;
    use crate::tensor::NativeArray;

    fn cpu_registry() -> Registry {
        let reg = Registry::new();
        reg.set_backend(BackendId::Cpu).unwrap();
        reg
    }

    fn array(values: &[f64], shape: &[usize], dtype: DType) -> Value {
        Value::Array(Array::from_native(NativeArray::Cpu(
            CpuTensor::from_f64(values, shape, dtype).unwrap(),
        )))
    }

    #[test]
    fn test_stages_follow_flags() {
        let matmul = Pipeline::new(OpKind::Matmul);
        assert_eq!(
            matmul.stages(),
            &[
                Stage::GuardDtypes,
                Stage::Promote,
                Stage::ToNative,
                Stage::Invoke,
                Stage::Output,
                Stage::ToUnified,
                Stage::NormalizeErrors,
            ]
        );
        let qr = Pipeline::new(OpKind::Qr);
        assert!(!qr.stages().contains(&Stage::Promote));
        assert!(!qr.stages().contains(&Stage::Output));
    }

    #[test]
    fn test_promotes_operands() {
        let reg = cpu_registry();
        let pipeline = Pipeline::new(OpKind::Add);
        let args = bind(
            pipeline.spec(),
            vec![array(&[1.0, 2.0], &[2], DType::I32), array(&[0.5], &[1], DType::F64)],
            vec![],
        )
        .unwrap();
        let result = pipeline.run(&reg, &args, None, KeyPolicy::Strict).unwrap();
        let result = result.as_array().unwrap();
        assert_eq!(result.dtype(), DType::F64);
        assert_eq!(result.to_vec_f64(), vec![1.5, 2.5]);
    }

    #[test]
    fn test_guard_rejects_before_kernel() {
        let reg = cpu_registry();
        let pipeline = Pipeline::new(OpKind::Det);
        let args = [array(&[1.0, 0.0, 0.0, 1.0], &[2, 2], DType::F16)];
        let err = pipeline.run(&reg, &args, None, KeyPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedDType { dtype: DType::F16, op: "det", backend: BackendId::Cpu, ref version }
                if version == "1.11.0"
        ));
    }

    #[test]
    fn test_kernel_errors_normalized() {
        let reg = cpu_registry();
        let pipeline = Pipeline::new(OpKind::Inv);
        let args = [array(&[1.0, 2.0, 2.0, 4.0], &[2, 2], DType::F64), Value::Bool(false)];
        let err = pipeline.run(&reg, &args, None, KeyPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            Error::BackendKernel { op: "inv", source: KernelError::Singular, .. }
        ));

        assert!(matches!(
            normalize(KernelError::OutputShape { expected: vec![3], got: vec![2] }, BackendId::Cpu, "add"),
            Error::OutputShapeMismatch { .. }
        ));
        let shape = KernelError::Shape { lhs: vec![3, 4], rhs: vec![5, 4] };
        let err = normalize(shape, BackendId::Cpu, "add");
        assert_eq!(err.category(), crate::error::ErrorCategory::Contract);
        assert!(matches!(err, Error::ShapeMismatch { ref lhs, .. } if *lhs == [3, 4]));
    }

    #[test]
    fn test_kind_checked_per_leaf() {
        let reg = cpu_registry();
        let pipeline = Pipeline::new(OpKind::Det);
        let err = pipeline.run(&reg, &[Value::Int(3)], None, KeyPolicy::Strict).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { ref arg, .. } if arg == "x"));
    }
}
