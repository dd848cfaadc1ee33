//! Row-major f64 buffer that every kernel consumes and produces

use super::KernelError;
use crate::tensor::Shape;

/// Dense row-major f64 tensor
///
/// Backends convert their native tensors to `Dense` before a kernel runs and
/// convert the result back afterwards; dtype bookkeeping stays with the
/// backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Dense {
    shape: Shape,
    data: Vec<f64>,
}

impl Dense {
    /// Create from a shape and matching row-major data
    pub fn new(shape: impl Into<Shape>, data: Vec<f64>) -> Result<Self, KernelError> {
        let shape = shape.into();
        if shape.checked_numel() != Some(data.len()) {
            return Err(KernelError::Invalid(format!(
                "{} values cannot fill shape {:?}",
                data.len(),
                shape
            )));
        }
        Ok(Self { shape, data })
    }

    /// Internal constructor; callers guarantee `data.len() == shape.numel()`
    pub(crate) fn from_parts(shape: Shape, data: Vec<f64>) -> Self {
        debug_assert_eq!(shape.numel(), data.len());
        Self { shape, data }
    }

    /// 0-d tensor holding one value
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Shape::new(),
            data: vec![value],
        }
    }

    /// Tensor filled with one value
    pub fn full(shape: impl Into<Shape>, value: f64) -> Self {
        let shape = shape.into();
        let n = shape.numel();
        Self {
            shape,
            data: vec![value; n],
        }
    }

    /// Dimensions
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Number of elements
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Row-major values
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Take ownership of the values
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Same values under a new shape with the same element count
    pub fn reshape(self, shape: impl Into<Shape>) -> Result<Self, KernelError> {
        Self::new(shape, self.data)
    }

    /// Require at least `min` dimensions
    pub(crate) fn require_rank(&self, min: usize) -> Result<(), KernelError> {
        if self.ndim() < min {
            return Err(KernelError::Rank {
                min,
                got: self.ndim(),
            });
        }
        Ok(())
    }

    /// Split a `(..., m, n)` tensor into its batch shape and matrix size
    pub(crate) fn matrix_dims(&self) -> Result<(Shape, usize, usize), KernelError> {
        self.require_rank(2)?;
        let nd = self.ndim();
        let batch: Shape = self.shape[..nd - 2].iter().copied().collect();
        Ok((batch, self.shape[nd - 2], self.shape[nd - 1]))
    }

    /// Like [`Dense::matrix_dims`], rejecting non-square matrices
    pub(crate) fn square_dims(&self) -> Result<(Shape, usize), KernelError> {
        let (batch, m, n) = self.matrix_dims()?;
        if m != n {
            return Err(KernelError::NotSquare(self.shape.to_vec()));
        }
        Ok((batch, n))
    }

    /// The `b`-th matrix of a batch of `m x n` matrices
    pub(crate) fn matrix(&self, b: usize, m: usize, n: usize) -> &[f64] {
        &self.data[b * m * n..(b + 1) * m * n]
    }

    /// Materialize this tensor broadcast to `shape`
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self, KernelError> {
        if self.shape.as_slice() == shape {
            return Ok(self.clone());
        }
        let offsets = broadcast_offsets(&self.shape, shape)?;
        let data = offsets.into_iter().map(|o| self.data[o]).collect();
        Ok(Self::from_parts(Shape::from(shape), data))
    }

    /// Reorder axes: output axis `i` is input axis `axes[i]`
    pub fn permute(&self, axes: &[usize]) -> Self {
        debug_assert_eq!(axes.len(), self.ndim());
        if axes.iter().enumerate().all(|(i, &a)| i == a) {
            return self.clone();
        }
        let in_strides = self.shape.strides();
        let out_shape: Shape = axes.iter().map(|&a| self.shape[a]).collect();
        let strides: Vec<usize> = axes.iter().map(|&a| in_strides[a]).collect();
        let data = gather(&out_shape, &strides, &self.data);
        Self::from_parts(out_shape, data)
    }

    /// Swap the two trailing axes
    pub fn transpose_last2(&self) -> Result<Self, KernelError> {
        self.require_rank(2)?;
        let nd = self.ndim();
        let mut axes: Vec<usize> = (0..nd).collect();
        axes.swap(nd - 2, nd - 1);
        Ok(self.permute(&axes))
    }

    /// Move one axis to the last position, keeping the others in order
    pub(crate) fn move_axis_last(&self, axis: usize) -> Self {
        let nd = self.ndim();
        let axes: Vec<usize> = (0..nd).filter(|&a| a != axis).chain([axis]).collect();
        self.permute(&axes)
    }
}

/// Broadcast two shapes, as a kernel error
pub(crate) fn broadcast_dims(a: &[usize], b: &[usize]) -> Result<Shape, KernelError> {
    crate::tensor::broadcast_shapes(a, b).map_err(|_| KernelError::Shape {
        lhs: a.to_vec(),
        rhs: b.to_vec(),
    })
}

/// For each element of `dst` (row-major), the offset of the `src` element it
/// reads under broadcasting.
pub(crate) fn broadcast_offsets(src: &[usize], dst: &[usize]) -> Result<Vec<usize>, KernelError> {
    if src.len() > dst.len() {
        return Err(KernelError::Shape {
            lhs: src.to_vec(),
            rhs: dst.to_vec(),
        });
    }
    let lead = dst.len() - src.len();
    let src_strides = Shape::from(src).strides();
    let mut strides = vec![0usize; dst.len()];
    for (i, &d) in src.iter().enumerate() {
        if d == dst[lead + i] {
            strides[lead + i] = src_strides[i];
        } else if d != 1 {
            return Err(KernelError::Shape {
                lhs: src.to_vec(),
                rhs: dst.to_vec(),
            });
        }
    }
    let dst_shape = Shape::from(dst);
    let numel = dst_shape.numel();
    let mut offsets = Vec::with_capacity(numel);
    let mut index = vec![0usize; dst.len()];
    let mut offset = 0usize;
    for _ in 0..numel {
        offsets.push(offset);
        for d in (0..dst.len()).rev() {
            index[d] += 1;
            offset += strides[d];
            if index[d] < dst[d] {
                break;
            }
            offset -= strides[d] * index[d];
            index[d] = 0;
        }
    }
    Ok(offsets)
}

/// Read `src` through arbitrary strides into a row-major buffer of `shape`
fn gather(shape: &[usize], strides: &[usize], src: &[f64]) -> Vec<f64> {
    let numel: usize = shape.iter().product();
    let mut out = Vec::with_capacity(numel);
    let mut index = vec![0usize; shape.len()];
    let mut offset = 0usize;
    for _ in 0..numel {
        out.push(src[offset]);
        for d in (0..shape.len()).rev() {
            index[d] += 1;
            offset += strides[d];
            if index[d] < shape[d] {
                break;
            }
            offset -= strides[d] * index[d];
            index[d] = 0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_to() {
        let row = Dense::new([1, 3], vec![1.0, 2.0, 3.0]).unwrap();
        let b = row.broadcast_to(&[2, 3]).unwrap();
        assert_eq!(b.data(), &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);

        let col = Dense::new([2, 1], vec![1.0, 2.0]).unwrap();
        let b = col.broadcast_to(&[2, 2, 3]).unwrap();
        assert_eq!(b.shape().as_slice(), &[2, 2, 3]);
        assert_eq!(&b.data()[..6], &[1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);

        assert!(row.broadcast_to(&[2, 4]).is_err());
    }

    #[test]
    fn test_permute() {
        let t = Dense::new([2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let p = t.transpose_last2().unwrap();
        assert_eq!(p.shape().as_slice(), &[3, 2]);
        assert_eq!(p.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);

        let cube = Dense::new([2, 2, 2], (0..8).map(f64::from).collect()).unwrap();
        let moved = cube.move_axis_last(0);
        assert_eq!(moved.data(), &[0.0, 4.0, 1.0, 5.0, 2.0, 6.0, 3.0, 7.0]);
    }

    #[test]
    fn test_length_check() {
        assert!(Dense::new([2, 2], vec![1.0]).is_err());
        assert_eq!(Dense::scalar(3.0).numel(), 1);
    }
}
