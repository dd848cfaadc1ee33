//! The `columnar` backend

use super::ColumnTensor;
use crate::dispatch::op::OpKind;
use crate::dtype::{DType, DTypeSet};
use crate::kernels::{Dense, KernelError};
use crate::runtime::{
    Backend, BackendId, UnsupportedDtypes, UnsupportedRule, Version, VersionRange, fit_output, foreign,
};
use crate::tensor::NativeArray;

/// Version reported to the unsupported-dtype table
pub const COLUMNAR_VERSION: Version = Version::new(2, 9, 1);

const HALF: DTypeSet = DTypeSet::HALF_FLOATS;
const F16_ONLY: DTypeSet = DTypeSet::single(DType::F16);
const UP_TO: VersionRange = VersionRange::AndBelow(COLUMNAR_VERSION);

/// Dtypes the columnar kernels reject, per operation
static COLUMNAR_UNSUPPORTED: &[UnsupportedRule] = &[
    UnsupportedRule { op: OpKind::Cholesky, range: UP_TO, dtypes: HALF },
    UnsupportedRule { op: OpKind::Cross, range: UP_TO, dtypes: F16_ONLY },
    UnsupportedRule { op: OpKind::Det, range: UP_TO, dtypes: HALF },
    UnsupportedRule { op: OpKind::Eigh, range: UP_TO, dtypes: F16_ONLY },
    UnsupportedRule { op: OpKind::Eigvalsh, range: UP_TO, dtypes: HALF },
    UnsupportedRule {
        op: OpKind::Inner,
        range: UP_TO,
        dtypes: DTypeSet::of(&[DType::I8, DType::I16, DType::U8, DType::U16, DType::U32, DType::U64]),
    },
    UnsupportedRule { op: OpKind::Inv, range: UP_TO, dtypes: HALF },
    UnsupportedRule { op: OpKind::MatrixNorm, range: UP_TO, dtypes: HALF },
    UnsupportedRule { op: OpKind::MatrixPower, range: UP_TO, dtypes: HALF },
    UnsupportedRule { op: OpKind::MatrixRank, range: UP_TO, dtypes: HALF },
    UnsupportedRule {
        op: OpKind::MatrixTranspose,
        range: UP_TO,
        dtypes: DTypeSet::INTS.union(F16_ONLY),
    },
    UnsupportedRule { op: OpKind::Pinv, range: UP_TO, dtypes: HALF },
    UnsupportedRule { op: OpKind::Qr, range: UP_TO, dtypes: HALF },
    UnsupportedRule { op: OpKind::Slogdet, range: UP_TO, dtypes: HALF },
    UnsupportedRule { op: OpKind::Solve, range: UP_TO, dtypes: HALF },
    UnsupportedRule { op: OpKind::Svd, range: UP_TO, dtypes: HALF },
    UnsupportedRule { op: OpKind::Svdvals, range: UP_TO, dtypes: HALF },
    UnsupportedRule { op: OpKind::Trace, range: UP_TO, dtypes: HALF },
    UnsupportedRule { op: OpKind::Vecdot, range: UP_TO, dtypes: DTypeSet::FLOATS },
    UnsupportedRule { op: OpKind::VectorNorm, range: UP_TO, dtypes: F16_ONLY },
    UnsupportedRule {
        op: OpKind::VectorToSkewSymmetricMatrix,
        range: VersionRange::Exact(COLUMNAR_VERSION),
        dtypes: DTypeSet::INTS.union(DTypeSet::of(&[DType::F16, DType::F64])),
    },
];

/// Column-major backend without native `out` support
///
/// Every `out` buffer goes through the emulated copy path of the dispatch
/// pipeline.
#[derive(Debug)]
pub struct ColumnarBackend {
    unsupported: UnsupportedDtypes,
}

impl ColumnarBackend {
    /// Backend with the default unsupported-dtype table
    pub fn new() -> Self {
        Self {
            unsupported: UnsupportedDtypes::from_rules(COLUMNAR_UNSUPPORTED),
        }
    }
}

impl Default for ColumnarBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for ColumnarBackend {
    fn id(&self) -> BackendId {
        BackendId::Columnar
    }

    fn version(&self) -> Version {
        COLUMNAR_VERSION
    }

    fn unsupported(&self) -> &UnsupportedDtypes {
        &self.unsupported
    }

    fn supports_native_out(&self, _op: OpKind) -> bool {
        false
    }

    fn from_dense(&self, dense: &Dense, dtype: DType) -> NativeArray {
        let mut tensor = ColumnTensor::zeros(dense.shape(), dtype);
        tensor.write_row_major(dense.data());
        NativeArray::Columnar(tensor)
    }

    fn to_dense(&self, native: &NativeArray) -> Result<Dense, KernelError> {
        match native {
            NativeArray::Columnar(t) => Dense::new(t.shape().clone(), t.to_row_major()),
            other => Err(foreign(BackendId::Columnar, other)),
        }
    }

    fn cast(&self, native: &NativeArray, dtype: DType) -> Result<NativeArray, KernelError> {
        match native {
            NativeArray::Columnar(t) => Ok(NativeArray::Columnar(t.cast(dtype))),
            other => Err(foreign(BackendId::Columnar, other)),
        }
    }

    fn assign(&self, dst: &mut NativeArray, src: &Dense) -> Result<(), KernelError> {
        match dst {
            NativeArray::Columnar(t) => {
                let fitted = fit_output(src, t.shape())?;
                t.write_row_major(fitted.data());
                Ok(())
            }
            other => Err(foreign(BackendId::Columnar, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table() {
        let backend = ColumnarBackend::new();
        let v = backend.version();
        let table = backend.unsupported();
        assert!(table.is_unsupported(OpKind::Vecdot, v, DType::F32));
        assert!(!table.is_unsupported(OpKind::Vecdot, v, DType::I32));
        assert!(table.is_unsupported(OpKind::VectorToSkewSymmetricMatrix, v, DType::F64));
        assert!(!table.is_unsupported(OpKind::VectorToSkewSymmetricMatrix, v, DType::F32));
        assert!(table.is_unsupported(OpKind::Inner, v, DType::U8));
        assert!(!table.is_unsupported(OpKind::Inner, v, DType::I32));
    }

    #[test]
    fn test_never_native_out() {
        let backend = ColumnarBackend::new();
        assert!(OpKind::all().all(|op| !backend.supports_native_out(op)));
    }

    #[test]
    fn test_round_trip_through_dense() {
        let backend = ColumnarBackend::new();
        let dense = Dense::new([2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let native = backend.from_dense(&dense, DType::F64);
        assert_eq!(backend.to_dense(&native).unwrap(), dense);

        let cpu = NativeArray::Cpu(crate::runtime::cpu::CpuTensor::zeros(&[1], DType::F32));
        assert!(backend.to_dense(&cpu).is_err());
    }
}
