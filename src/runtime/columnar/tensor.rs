//! Column-major f64 tensor owned by the columnar backend

use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::tensor::Shape;
use std::sync::Arc;

/// Native tensor of the `columnar` backend
///
/// Values are kept as f64 in column-major (first index fastest) order and are
/// always rounded to what `dtype` can represent, so reading an `i8` tensor
/// never yields a fractional or out-of-range value.
#[derive(Clone, Debug)]
pub struct ColumnTensor {
    shape: Shape,
    dtype: DType,
    data: Arc<Vec<f64>>,
}

impl ColumnTensor {
    /// Create from row-major values, rounding each into `dtype`
    pub fn from_row_major(values: &[f64], shape: &[usize], dtype: DType) -> Result<Self> {
        let shape = Shape::from(shape);
        if shape.checked_numel() != Some(values.len()) {
            return Err(Error::DataLength {
                len: values.len(),
                shape: shape.to_vec(),
            });
        }
        let mut data = reorder(values, &shape, Order::ToColumnMajor);
        data.iter_mut().for_each(|v| *v = dtype.quantize(*v));
        Ok(Self {
            shape,
            dtype,
            data: Arc::new(data),
        })
    }

    /// All-zero tensor
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        let shape = Shape::from(shape);
        let n = shape.numel();
        Self {
            shape,
            dtype,
            data: Arc::new(vec![0.0; n]),
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

    /// Values in storage (column-major) order
    pub fn column_major(&self) -> &[f64] {
        &self.data
    }

    /// Values in row-major order
    pub fn to_row_major(&self) -> Vec<f64> {
        reorder(&self.data, &self.shape, Order::ToRowMajor)
    }

    /// Overwrite every element from row-major values, rounding into the dtype
    pub(crate) fn write_row_major(&mut self, values: &[f64]) {
        debug_assert_eq!(values.len(), self.numel());
        let dtype = self.dtype;
        let reordered = reorder(values, &self.shape, Order::ToColumnMajor);
        let data = Arc::make_mut(&mut self.data);
        for (slot, v) in data.iter_mut().zip(reordered) {
            *slot = dtype.quantize(v);
        }
    }

    /// Copy with every value rounded into another dtype
    pub(crate) fn cast(&self, dtype: DType) -> Self {
        Self {
            shape: self.shape.clone(),
            dtype,
            data: Arc::new(self.data.iter().map(|&v| dtype.quantize(v)).collect()),
        }
    }
}

#[derive(Copy, Clone)]
enum Order {
    ToColumnMajor,
    ToRowMajor,
}

/// Permute a flat buffer between row-major and column-major layouts
fn reorder(values: &[f64], shape: &[usize], order: Order) -> Vec<f64> {
    let ndim = shape.len();
    if ndim < 2 {
        return values.to_vec();
    }
    let numel: usize = shape.iter().product();
    let mut out = vec![0.0; numel];
    let mut index = vec![0usize; ndim];
    for row_offset in 0..numel {
        // column-major offset of the current multi-index
        let mut col_offset = 0;
        let mut stride = 1;
        for d in 0..ndim {
            col_offset += index[d] * stride;
            stride *= shape[d];
        }
        match order {
            Order::ToColumnMajor => out[col_offset] = values[row_offset],
            Order::ToRowMajor => out[row_offset] = values[col_offset],
        }
        // advance the row-major multi-index
        for d in (0..ndim).rev() {
            index[d] += 1;
            if index[d] < shape[d] {
                break;
            }
            index[d] = 0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_is_column_major() {
        let t = ColumnTensor::from_row_major(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3], DType::F64)
            .unwrap();
        assert_eq!(t.column_major(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(t.to_row_major(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_three_dim_roundtrip() {
        let values: Vec<f64> = (0..24).map(f64::from).collect();
        let t = ColumnTensor::from_row_major(&values, &[2, 3, 4], DType::F64).unwrap();
        assert_eq!(t.to_row_major(), values);
    }

    #[test]
    fn test_values_are_quantized() {
        let t = ColumnTensor::from_row_major(&[1.7, -300.0], &[2], DType::I8).unwrap();
        assert_eq!(t.to_row_major(), vec![1.0, -128.0]);
        let c = t.cast(DType::Bool);
        assert_eq!(c.to_row_major(), vec![1.0, 1.0]);
    }
}
