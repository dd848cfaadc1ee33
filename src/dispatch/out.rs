//! The `out` buffer protocol
//!
//! A caller-provided buffer is filled either by the backend kernel itself
//! (native path) or by copying a freshly computed result into it (emulated
//! path). Both paths broadcast the result into the buffer's shape, convert to
//! the buffer's dtype, and hand back the caller's own handle.

use super::op::{OpKind, OpSpec};
use crate::error::{Error, Result};
use crate::kernels::KernelError;
use crate::runtime::{Backend, BackendId};
use crate::tensor::Array;
use crate::value::Value;

/// How a backend fills an `out` buffer for one operation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutPath {
    /// The kernel writes into the buffer
    Native,
    /// The result is computed fresh and copied in
    Emulated,
}

impl OutPath {
    /// Path `backend` takes for `op`
    pub fn for_backend(backend: &dyn Backend, op: OpKind) -> Self {
        if backend.supports_native_out(op) {
            Self::Native
        } else {
            Self::Emulated
        }
    }
}

/// Validate a leaf-level `out` argument.
///
/// `None` means no buffer. Only unified arrays of the executing backend are
/// accepted, since the caller must get the same handle back.
pub(crate) fn buffer(spec: &OpSpec, out: Option<&Value>, backend: BackendId) -> Result<Option<Array>> {
    match out {
        None | Some(Value::None) => Ok(None),
        Some(_) if !spec.out => Err(Error::invalid_argument(
            spec.name,
            "out",
            "operation does not accept an output buffer",
        )),
        Some(Value::Array(a)) => {
            if a.backend() != backend {
                return Err(Error::StaleArray {
                    array: a.backend(),
                    active: backend,
                });
            }
            Ok(Some(a.clone()))
        }
        Some(other) => Err(Error::invalid_argument(
            spec.name,
            "out",
            format!("expected an array, got {}", other.kind_name()),
        )),
    }
}

/// Native path: run the kernel with exclusive access to the buffer
pub(crate) fn write_native(
    backend: &dyn Backend,
    spec: &'static OpSpec,
    args: &[Value],
    buffer: &Array,
) -> std::result::Result<Value, KernelError> {
    let mut guard = buffer.write();
    backend.invoke(spec, args, Some(&mut *guard))?;
    Ok(Value::Array(buffer.clone()))
}

/// Emulated path: copy a computed native result into the buffer
pub(crate) fn write_emulated(
    backend: &dyn Backend,
    spec: &OpSpec,
    result: &Value,
    buffer: &Array,
) -> std::result::Result<Value, KernelError> {
    let Value::Native(native) = result else {
        return Err(KernelError::Invalid(format!(
            "'{}' produced a {} which cannot be written into an output buffer",
            spec.name,
            result.kind_name()
        )));
    };
    let dense = backend.to_dense(native)?;
    log::trace!(
        "{} emulating out for '{}': {:?} into {:?}",
        backend.id(),
        spec.name,
        dense.shape(),
        buffer.shape()
    );
    backend.assign(&mut buffer.write(), &dense)?;
    Ok(Value::Array(buffer.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::kernels::Dense;
    use crate::runtime::cpu::{CpuBackend, CpuTensor};
    use crate::tensor::NativeArray;

    fn cpu_array(values: &[f64], shape: &[usize], dtype: DType) -> Array {
        Array::from_native(NativeArray::Cpu(CpuTensor::from_f64(values, shape, dtype).unwrap()))
    }

    #[test]
    fn test_buffer_validation() {
        let det = OpKind::Det.spec();
        let array = cpu_array(&[0.0], &[1], DType::F32);
        let out = Value::Array(array.clone());
        assert!(buffer(det, Some(&out), BackendId::Cpu).unwrap().unwrap().is_same(&array));
        assert!(buffer(det, None, BackendId::Cpu).unwrap().is_none());
        assert!(matches!(
            buffer(det, Some(&Value::Int(1)), BackendId::Cpu),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            buffer(OpKind::Qr.spec(), Some(&out), BackendId::Cpu),
            Err(Error::InvalidArgument { arg, .. }) if arg == "out"
        ));
        assert!(matches!(
            buffer(det, Some(&out), BackendId::Columnar),
            Err(Error::StaleArray { .. })
        ));
    }

    #[test]
    fn test_emulated_copy_broadcasts_and_converts() {
        let backend = CpuBackend::new();
        let result = backend.from_dense(&Dense::new([2], vec![1.6, 2.2]).unwrap(), DType::F64);
        let out = cpu_array(&[0.0; 4], &[2, 2], DType::I32);
        let returned = write_emulated(
            &backend,
            OpKind::Add.spec(),
            &Value::Native(result),
            &out,
        )
        .unwrap();
        assert!(returned.as_array().unwrap().is_same(&out));
        assert_eq!(out.dtype(), DType::I32);
        assert_eq!(out.to_vec::<i32>(), vec![1, 2, 1, 2]);
    }

    #[test]
    fn test_emulated_copy_rejects_bad_shape() {
        let backend = CpuBackend::new();
        let result = backend.from_dense(&Dense::new([3], vec![1.0, 2.0, 3.0]).unwrap(), DType::F64);
        let out = cpu_array(&[0.0; 2], &[2], DType::F64);
        assert!(matches!(
            write_emulated(&backend, OpKind::Add.spec(), &Value::Native(result), &out),
            Err(KernelError::OutputShape { .. })
        ));
        assert_eq!(out.to_vec_f64(), vec![0.0, 0.0]);
    }
}
