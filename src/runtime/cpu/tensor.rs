//! Row-major byte-backed tensor owned by the cpu backend

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::tensor::Shape;
use std::sync::Arc;

/// Native tensor of the `cpu` backend
///
/// Elements are stored row-major as raw bytes in the dtype's own width
/// (`bool` as one byte holding 0 or 1). Storage is shared between clones and
/// copied on the first write, so a snapshot taken before an in-place write
/// keeps the old values.
#[derive(Clone, Debug)]
pub struct CpuTensor {
    shape: Shape,
    dtype: DType,
    storage: Arc<Vec<u8>>,
}

impl CpuTensor {
    /// Create from a typed slice; the dtype is inferred from `T`
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize]) -> Result<Self> {
        let shape = Shape::from(shape);
        if shape.checked_numel() != Some(data.len()) {
            return Err(Error::DataLength {
                len: data.len(),
                shape: shape.to_vec(),
            });
        }
        Ok(Self {
            shape,
            dtype: T::DTYPE,
            storage: Arc::new(bytemuck::cast_slice(data).to_vec()),
        })
    }

    /// Create from f64 values, rounding each into `dtype`
    pub fn from_f64(values: &[f64], shape: &[usize], dtype: DType) -> Result<Self> {
        let shape = Shape::from(shape);
        if shape.checked_numel() != Some(values.len()) {
            return Err(Error::DataLength {
                len: values.len(),
                shape: shape.to_vec(),
            });
        }
        let mut tensor = Self::zeros(&shape, dtype);
        tensor.write_f64(values);
        Ok(tensor)
    }

    /// All-zero tensor
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        let shape = Shape::from(shape);
        let bytes = shape.numel() * dtype.size_in_bytes();
        Self {
            shape,
            dtype,
            storage: Arc::new(vec![0u8; bytes]),
        }
    }

    /// Dimensions
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Element type
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of elements
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Raw storage bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage
    }

    /// Whether two tensors share one storage buffer
    pub fn shares_storage(&self, other: &CpuTensor) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Read every element as f64, row-major
    pub fn to_f64_vec(&self) -> Vec<f64> {
        crate::dispatch_dtype!(self.dtype, T => {
            self.storage
                .chunks_exact(std::mem::size_of::<T>())
                .map(|chunk| bytemuck::pod_read_unaligned::<T>(chunk).to_f64())
                .collect()
        })
    }

    /// Read every element as `T`; `None` if `T` is not this tensor's dtype
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        if T::DTYPE != self.dtype {
            return None;
        }
        Some(
            self.storage
                .chunks_exact(std::mem::size_of::<T>())
                .map(bytemuck::pod_read_unaligned::<T>)
                .collect(),
        )
    }

    /// Overwrite every element from f64 values, rounding into the dtype.
    ///
    /// `values` must hold exactly `numel` elements.
    pub(crate) fn write_f64(&mut self, values: &[f64]) {
        debug_assert_eq!(values.len(), self.numel());
        let dtype = self.dtype;
        let storage = Arc::make_mut(&mut self.storage);
        crate::dispatch_dtype!(dtype, T => {
            let width = std::mem::size_of::<T>();
            for (chunk, &v) in storage.chunks_exact_mut(width).zip(values) {
                let elem = T::from_f64(dtype.quantize(v));
                chunk.copy_from_slice(bytemuck::bytes_of(&elem));
            }
        })
    }
}
