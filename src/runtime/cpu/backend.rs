//! The `cpu` backend

use super::CpuTensor;
use crate::dispatch::op::OpKind;
use crate::dtype::{DType, DTypeSet};
use crate::kernels::{Dense, KernelError};
use crate::runtime::{
    Backend, BackendId, UnsupportedDtypes, UnsupportedRule, Version, VersionRange, fit_output, foreign,
};
use crate::tensor::NativeArray;

/// Version reported to the unsupported-dtype table
pub const CPU_VERSION: Version = Version::new(1, 11, 0);

const HALF: DTypeSet = DTypeSet::HALF_FLOATS;
const F16_ONLY: DTypeSet = DTypeSet::single(DType::F16);
const UP_TO: VersionRange = VersionRange::AndBelow(CPU_VERSION);

macro_rules! rules {
    ($($op:ident => $set:expr),* $(,)?) => {
        &[$(UnsupportedRule { op: OpKind::$op, range: UP_TO, dtypes: $set }),*]
    };
}

/// Dtypes the cpu kernels reject, per operation
static CPU_UNSUPPORTED: &[UnsupportedRule] = rules![
    Cholesky => HALF,
    Cross => F16_ONLY,
    Det => HALF,
    Eigh => HALF,
    Eigvalsh => HALF,
    Inner => DTypeSet::single(DType::I8),
    Inv => HALF,
    MatrixNorm => HALF,
    MatrixRank => HALF,
    Pinv => HALF,
    Qr => HALF,
    Slogdet => HALF,
    Solve => HALF,
    Svd => HALF,
    Svdvals => HALF,
    Tensordot => DTypeSet::single(DType::I32),
    Vander => HALF,
];

/// Operations that write into a caller-provided buffer directly
const NATIVE_OUT: &[OpKind] = &[
    OpKind::Cholesky,
    OpKind::Cross,
    OpKind::Det,
    OpKind::Eigvalsh,
    OpKind::Inner,
    OpKind::Inv,
    OpKind::Matmul,
    OpKind::MatrixNorm,
    OpKind::MatrixPower,
    OpKind::MatrixRank,
    OpKind::Outer,
    OpKind::Pinv,
    OpKind::Svdvals,
    OpKind::Vecdot,
    OpKind::VectorNorm,
    OpKind::VectorToSkewSymmetricMatrix,
    OpKind::Add,
    OpKind::Subtract,
    OpKind::Multiply,
    OpKind::Divide,
];

/// Row-major reference backend
///
/// Tensors are [`CpuTensor`]s. Most operations accept an `out` buffer
/// natively: the kernel result is written straight into the buffer's storage.
#[derive(Debug)]
pub struct CpuBackend {
    unsupported: UnsupportedDtypes,
}

impl CpuBackend {
    /// Backend with the default unsupported-dtype table
    pub fn new() -> Self {
        Self {
            unsupported: UnsupportedDtypes::from_rules(CPU_UNSUPPORTED),
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for CpuBackend {
    fn id(&self) -> BackendId {
        BackendId::Cpu
    }

    fn version(&self) -> Version {
        CPU_VERSION
    }

    fn unsupported(&self) -> &UnsupportedDtypes {
        &self.unsupported
    }

    fn supports_native_out(&self, op: OpKind) -> bool {
        NATIVE_OUT.contains(&op)
    }

    fn from_dense(&self, dense: &Dense, dtype: DType) -> NativeArray {
        let mut tensor = CpuTensor::zeros(dense.shape(), dtype);
        tensor.write_f64(dense.data());
        NativeArray::Cpu(tensor)
    }

    fn to_dense(&self, native: &NativeArray) -> Result<Dense, KernelError> {
        match native {
            NativeArray::Cpu(t) => Dense::new(t.shape().clone(), t.to_f64_vec()),
            #[allow(unreachable_patterns)]
            other => Err(foreign(BackendId::Cpu, other)),
        }
    }

    fn cast(&self, native: &NativeArray, dtype: DType) -> Result<NativeArray, KernelError> {
        let dense = self.to_dense(native)?;
        Ok(self.from_dense(&dense, dtype))
    }

    fn assign(&self, dst: &mut NativeArray, src: &Dense) -> Result<(), KernelError> {
        match dst {
            NativeArray::Cpu(t) => {
                let fitted = fit_output(src, t.shape())?;
                t.write_f64(fitted.data());
                Ok(())
            }
            #[allow(unreachable_patterns)]
            other => Err(foreign(BackendId::Cpu, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_version() {
        let cpu = CpuBackend::new();
        let table = cpu.unsupported();
        assert!(table.is_unsupported(OpKind::Cholesky, cpu.version(), DType::BF16));
        assert!(table.is_unsupported(OpKind::Tensordot, cpu.version(), DType::I32));
        assert!(!table.is_unsupported(OpKind::Matmul, cpu.version(), DType::F16));
        // rules stop applying past the pinned version
        assert!(!table.is_unsupported(OpKind::Cholesky, Version::new(2, 0, 0), DType::BF16));
    }

    #[test]
    fn test_native_out_flags() {
        let cpu = CpuBackend::new();
        assert!(cpu.supports_native_out(OpKind::Matmul));
        assert!(!cpu.supports_native_out(OpKind::Trace));
        assert!(!cpu.supports_native_out(OpKind::Vander));
    }

    #[test]
    fn test_assign_broadcasts_and_converts() {
        let cpu = CpuBackend::new();
        let mut dst = NativeArray::Cpu(CpuTensor::zeros(&[2, 2], DType::I32));
        let row = Dense::new([2], vec![1.6, -2.2]).unwrap();
        cpu.assign(&mut dst, &row).unwrap();
        assert_eq!(dst.to_f64_vec(), vec![1.0, -2.0, 1.0, -2.0]);

        let wide = Dense::new([3], vec![0.0; 3]).unwrap();
        assert!(matches!(cpu.assign(&mut dst, &wide), Err(KernelError::OutputShape { .. })));
    }
}
