//! Tagged native tensor: one variant per backend

use crate::dtype::DType;
use crate::runtime::BackendId;
#[cfg(feature = "columnar")]
use crate::runtime::columnar::ColumnTensor;
use crate::runtime::cpu::CpuTensor;
use crate::tensor::Shape;

/// A backend's own tensor representation
///
/// The variant is the backend identity: a `Cpu` value can only have been
/// produced by (and is only accepted by) the `cpu` backend.
#[derive(Clone, Debug)]
pub enum NativeArray {
    /// Row-major byte storage
    Cpu(CpuTensor),
    /// Column-major f64 storage
    #[cfg(feature = "columnar")]
    Columnar(ColumnTensor),
}

impl NativeArray {
    /// Backend that owns this tensor
    pub fn backend(&self) -> BackendId {
        match self {
            Self::Cpu(_) => BackendId::Cpu,
            #[cfg(feature = "columnar")]
            Self::Columnar(_) => BackendId::Columnar,
        }
    }

    /// Dimensions
    pub fn shape(&self) -> &Shape {
        match self {
            Self::Cpu(t) => t.shape(),
            #[cfg(feature = "columnar")]
            Self::Columnar(t) => t.shape(),
        }
    }

    /// Element type
    pub fn dtype(&self) -> DType {
        match self {
            Self::Cpu(t) => t.dtype(),
            #[cfg(feature = "columnar")]
            Self::Columnar(t) => t.dtype(),
        }
    }

    /// Number of elements
    pub fn numel(&self) -> usize {
        self.shape().numel()
    }

    /// Device tag; opaque to the dispatch core
    pub fn device(&self) -> &'static str {
        match self {
            Self::Cpu(_) => "cpu:0",
            #[cfg(feature = "columnar")]
            Self::Columnar(_) => "host",
        }
    }

    /// Element values as f64 in row-major order
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Self::Cpu(t) => t.to_f64_vec(),
            #[cfg(feature = "columnar")]
            Self::Columnar(t) => t.to_row_major(),
        }
    }
}

impl From<CpuTensor> for NativeArray {
    fn from(t: CpuTensor) -> Self {
        Self::Cpu(t)
    }
}

#[cfg(feature = "columnar")]
impl From<ColumnTensor> for NativeArray {
    fn from(t: ColumnTensor) -> Self {
        Self::Columnar(t)
    }
}
