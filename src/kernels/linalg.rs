//! Products, diagonals and other structural linear-algebra kernels

use super::dense::{Dense, broadcast_dims};
use super::{KernelError, axis_index, checked_shape, map_batches};
use crate::tensor::Shape;
use crate::value::Value;

/// `C[m x n] = A[m x k] @ B[k x n]`, i-k-j loop order
pub(crate) fn matmul_2d(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut c = vec![0.0; m * n];
    for i in 0..m {
        let row = &mut c[i * n..(i + 1) * n];
        for p in 0..k {
            let a_ip = a[i * k + p];
            if a_ip == 0.0 {
                continue;
            }
            let b_row = &b[p * n..(p + 1) * n];
            for (c_ij, &b_pj) in row.iter_mut().zip(b_row) {
                *c_ij += a_ip * b_pj;
            }
        }
    }
    c
}

/// Matrix product with batch broadcasting.
///
/// A 1-D first operand is treated as a row vector and a 1-D second operand
/// as a column vector; the added dimension is removed from the result.
pub fn matmul(
    x1: &Dense,
    x2: &Dense,
    transpose_a: bool,
    transpose_b: bool,
) -> Result<Dense, KernelError> {
    if x1.ndim() == 0 || x2.ndim() == 0 {
        return Err(KernelError::Invalid(
            "matmul operands must have at least one dimension".into(),
        ));
    }
    let a = if transpose_a && x1.ndim() >= 2 {
        x1.transpose_last2()?
    } else {
        x1.clone()
    };
    let b = if transpose_b && x2.ndim() >= 2 {
        x2.transpose_last2()?
    } else {
        x2.clone()
    };

    let a_vec = a.ndim() == 1;
    let b_vec = b.ndim() == 1;
    let a = if a_vec {
        let k = a.numel();
        a.reshape([1, k])?
    } else {
        a
    };
    let b = if b_vec {
        let k = b.numel();
        b.reshape([k, 1])?
    } else {
        b
    };

    let (a_batch, m, k) = a.matrix_dims()?;
    let (b_batch, k2, n) = b.matrix_dims()?;
    if k != k2 {
        return Err(KernelError::Shape {
            lhs: x1.shape().to_vec(),
            rhs: x2.shape().to_vec(),
        });
    }

    let batch = broadcast_dims(&a_batch, &b_batch)?;
    let mut a_full = batch.clone();
    a_full.extend_from_slice(&[m, k]);
    let mut b_full = batch.clone();
    b_full.extend_from_slice(&[k, n]);
    let a = a.broadcast_to(&a_full)?;
    let b = b.broadcast_to(&b_full)?;

    let products = map_batches(batch.numel(), |i| {
        Ok(matmul_2d(a.matrix(i, m, k), b.matrix(i, k, n), m, k, n))
    })?;

    let mut shape = batch;
    if !a_vec {
        shape.push(m);
    }
    if !b_vec {
        shape.push(n);
    }
    Ok(Dense::from_parts(shape, products.concat()))
}

/// Contraction over the given axes of both operands.
///
/// `axes` is either an integer `n` (last `n` axes of `x1` against the first
/// `n` of `x2`) or a pair of axis lists.
pub fn tensordot(x1: &Dense, x2: &Dense, axes: &Value) -> Result<Dense, KernelError> {
    let (axes_a, axes_b) = match axes {
        Value::Int(n) => {
            let n = usize::try_from(*n)
                .map_err(|_| KernelError::Invalid(format!("tensordot axes must be non-negative, got {n}")))?;
            if n > x1.ndim() || n > x2.ndim() {
                return Err(KernelError::Invalid(format!(
                    "cannot contract {n} axes of shapes {:?} and {:?}",
                    x1.shape(),
                    x2.shape()
                )));
            }
            ((x1.ndim() - n..x1.ndim()).collect(), (0..n).collect())
        }
        Value::Seq(pair) if pair.len() == 2 => (
            axis_list(&pair[0], x1.ndim())?,
            axis_list(&pair[1], x2.ndim())?,
        ),
        other => {
            return Err(KernelError::Invalid(format!(
                "tensordot axes must be an integer or a pair of axis lists, got {}",
                other.kind_name()
            )));
        }
    };
    contract(x1, x2, &axes_a, &axes_b)
}

fn axis_list(value: &Value, ndim: usize) -> Result<Vec<usize>, KernelError> {
    match value {
        Value::Int(a) => Ok(vec![axis_index(*a, ndim)?]),
        Value::Seq(items) => items
            .iter()
            .map(|v| {
                v.as_int()
                    .ok_or_else(|| KernelError::Invalid("tensordot axes must be integers".into()))
                    .and_then(|a| axis_index(a, ndim))
            })
            .collect(),
        other => Err(KernelError::Invalid(format!(
            "tensordot axis list must be integers, got {}",
            other.kind_name()
        ))),
    }
}

/// Permute both operands so the contracted axes meet, then multiply
fn contract(a: &Dense, b: &Dense, axes_a: &[usize], axes_b: &[usize]) -> Result<Dense, KernelError> {
    let mismatch = || KernelError::Shape {
        lhs: a.shape().to_vec(),
        rhs: b.shape().to_vec(),
    };
    if axes_a.len() != axes_b.len() {
        return Err(mismatch());
    }
    for (&i, &j) in axes_a.iter().zip(axes_b) {
        if a.shape()[i] != b.shape()[j] {
            return Err(mismatch());
        }
    }

    let free_a: Vec<usize> = (0..a.ndim()).filter(|d| !axes_a.contains(d)).collect();
    let free_b: Vec<usize> = (0..b.ndim()).filter(|d| !axes_b.contains(d)).collect();

    let perm_a: Vec<usize> = free_a.iter().chain(axes_a).copied().collect();
    let perm_b: Vec<usize> = axes_b.iter().chain(&free_b).copied().collect();

    let m: usize = free_a.iter().map(|&d| a.shape()[d]).product();
    let n: usize = free_b.iter().map(|&d| b.shape()[d]).product();
    let k: usize = axes_a.iter().map(|&d| a.shape()[d]).product();

    let lhs = a.permute(&perm_a);
    let rhs = b.permute(&perm_b);
    let data = matmul_2d(lhs.data(), rhs.data(), m, k, n);

    let shape: Shape = free_a
        .iter()
        .map(|&d| a.shape()[d])
        .chain(free_b.iter().map(|&d| b.shape()[d]))
        .collect();
    Ok(Dense::from_parts(shape, data))
}

/// Inner product over the last axis; a 0-d operand scales the other
pub fn inner(x1: &Dense, x2: &Dense) -> Result<Dense, KernelError> {
    if x1.ndim() == 0 || x2.ndim() == 0 {
        return super::elementwise::binary(crate::dispatch::op::OpKind::Multiply, x1, x2);
    }
    contract(x1, x2, &[x1.ndim() - 1], &[x2.ndim() - 1])
}

/// Outer product of the flattened operands
pub fn outer(x1: &Dense, x2: &Dense) -> Dense {
    let (m, n) = (x1.numel(), x2.numel());
    let mut data = Vec::with_capacity(m * n);
    for &a in x1.data() {
        data.extend(x2.data().iter().map(|&b| a * b));
    }
    Dense::from_parts([m, n].into(), data)
}

/// Inverse of [`Dense::move_axis_last`]
fn restore_axis(t: &Dense, axis: usize) -> Dense {
    let last = t.ndim() - 1;
    let axes: Vec<usize> = (0..t.ndim())
        .map(|i| match i.cmp(&axis) {
            std::cmp::Ordering::Less => i,
            std::cmp::Ordering::Equal => last,
            std::cmp::Ordering::Greater => i - 1,
        })
        .collect();
    t.permute(&axes)
}

/// Both operands broadcast against each other, with `axis` moved last
fn broadcast_pair_along(
    x1: &Dense,
    x2: &Dense,
    axis: i64,
) -> Result<(Dense, Dense, usize), KernelError> {
    let shape = broadcast_dims(x1.shape(), x2.shape())?;
    let axis = axis_index(axis, shape.ndim())?;
    let a = x1.broadcast_to(&shape)?.move_axis_last(axis);
    let b = x2.broadcast_to(&shape)?.move_axis_last(axis);
    Ok((a, b, axis))
}

/// Cross product of 3-element vectors along `axis`
pub fn cross(x1: &Dense, x2: &Dense, axis: i64) -> Result<Dense, KernelError> {
    let (a, b, axis) = broadcast_pair_along(x1, x2, axis)?;
    if a.shape()[a.ndim() - 1] != 3 {
        return Err(KernelError::Invalid(format!(
            "cross product needs size 3 along axis {axis}, got shape {:?}",
            a.shape()
        )));
    }
    let mut data = Vec::with_capacity(a.numel());
    for (u, v) in a.data().chunks_exact(3).zip(b.data().chunks_exact(3)) {
        data.push(u[1] * v[2] - u[2] * v[1]);
        data.push(u[2] * v[0] - u[0] * v[2]);
        data.push(u[0] * v[1] - u[1] * v[0]);
    }
    let result = Dense::from_parts(a.shape().clone(), data);
    Ok(restore_axis(&result, axis))
}

/// Dot product along `axis` after broadcasting
pub fn vecdot(x1: &Dense, x2: &Dense, axis: i64) -> Result<Dense, KernelError> {
    let (a, b, _) = broadcast_pair_along(x1, x2, axis)?;
    let len = a.shape()[a.ndim() - 1];
    let shape: Shape = a.shape()[..a.ndim() - 1].iter().copied().collect();
    if len == 0 {
        return Ok(Dense::full(shape, 0.0));
    }
    let data = a
        .data()
        .chunks_exact(len)
        .zip(b.data().chunks_exact(len))
        .map(|(u, v)| u.iter().zip(v).map(|(p, q)| p * q).sum())
        .collect();
    Ok(Dense::from_parts(shape, data))
}

/// Diagonal with the given offset, appended as the last axis
pub fn diagonal(x: &Dense, offset: i64, axis1: i64, axis2: i64) -> Result<Dense, KernelError> {
    x.require_rank(2)?;
    let nd = x.ndim();
    let ax1 = axis_index(axis1, nd)?;
    let ax2 = axis_index(axis2, nd)?;
    if ax1 == ax2 {
        return Err(KernelError::Invalid(format!(
            "diagonal axes must differ, got {axis1} and {axis2}"
        )));
    }

    let mut axes: Vec<usize> = (0..nd).filter(|&d| d != ax1 && d != ax2).collect();
    axes.extend([ax1, ax2]);
    let t = x.permute(&axes);
    let (batch, d1, d2) = t.matrix_dims()?;

    let (row0, col0) = if offset >= 0 {
        (0usize, offset.unsigned_abs() as usize)
    } else {
        (offset.unsigned_abs() as usize, 0usize)
    };
    let len = d1.saturating_sub(row0).min(d2.saturating_sub(col0));

    let mut data = Vec::with_capacity(batch.numel() * len);
    for b in 0..batch.numel() {
        let m = t.matrix(b, d1, d2);
        data.extend((0..len).map(|i| m[(row0 + i) * d2 + col0 + i]));
    }
    let mut shape = batch;
    shape.push(len);
    Ok(Dense::from_parts(shape, data))
}

/// Sum along a diagonal
pub fn trace(x: &Dense, offset: i64, axis1: i64, axis2: i64) -> Result<Dense, KernelError> {
    let d = diagonal(x, offset, axis1, axis2)?;
    let len = d.shape()[d.ndim() - 1];
    let shape: Shape = d.shape()[..d.ndim() - 1].iter().copied().collect();
    if len == 0 {
        return Ok(Dense::full(shape, 0.0));
    }
    let data = d.data().chunks_exact(len).map(|c| c.iter().sum()).collect();
    Ok(Dense::from_parts(shape, data))
}

/// Build a matrix from a 1-D diagonal, or extract the diagonal of a 2-D input
pub fn diag(
    x: &Dense,
    offset: i64,
    padding_value: f64,
    num_rows: Option<i64>,
    num_cols: Option<i64>,
) -> Result<Dense, KernelError> {
    match x.ndim() {
        1 => {
            let n = x.numel();
            let k = usize::try_from(offset.unsigned_abs())
                .map_err(|_| KernelError::Invalid(format!("offset {offset} is too large")))?;
            let dim = |given: Option<i64>, name: &str| -> Result<usize, KernelError> {
                match given {
                    None => n
                        .checked_add(k)
                        .ok_or_else(|| KernelError::Invalid(format!("offset {offset} is too large"))),
                    Some(v) => usize::try_from(v)
                        .map_err(|_| KernelError::Invalid(format!("{name} must be non-negative, got {v}"))),
                }
            };
            let rows = dim(num_rows, "num_rows")?;
            let cols = dim(num_cols, "num_cols")?;
            let shape = checked_shape(&[rows, cols])?;
            let mut data = vec![padding_value; shape.numel()];
            for (i, &v) in x.data().iter().enumerate() {
                let (r, c) = if offset >= 0 {
                    (i, i.saturating_add(k))
                } else {
                    (i.saturating_add(k), i)
                };
                if r < rows && c < cols {
                    data[r * cols + c] = v;
                }
            }
            Ok(Dense::from_parts(shape, data))
        }
        2 => diagonal(x, offset, 0, 1),
        got => Err(KernelError::Invalid(format!(
            "diag expects a 1-D or 2-D input, got {got} dimensions"
        ))),
    }
}

/// `(..., 3)` vectors to `(..., 3, 3)` skew-symmetric matrices
pub fn vector_to_skew_symmetric_matrix(vector: &Dense) -> Result<Dense, KernelError> {
    vector.require_rank(1)?;
    let nd = vector.ndim();
    if vector.shape()[nd - 1] != 3 {
        return Err(KernelError::Invalid(format!(
            "expected vectors of size 3, got shape {:?}",
            vector.shape()
        )));
    }
    let mut data = Vec::with_capacity(vector.numel() * 3);
    for v in vector.data().chunks_exact(3) {
        let (a1, a2, a3) = (v[0], v[1], v[2]);
        data.extend_from_slice(&[0.0, -a3, a2, a3, 0.0, -a1, -a2, a1, 0.0]);
    }
    let mut shape = vector.shape().clone();
    shape.push(3);
    Ok(Dense::from_parts(shape, data))
}

/// Vandermonde matrix of a 1-D input
pub fn vander(x: &Dense, columns: Option<i64>, increasing: bool) -> Result<Dense, KernelError> {
    if x.ndim() != 1 {
        return Err(KernelError::Invalid(format!(
            "vander expects a 1-D input, got shape {:?}",
            x.shape()
        )));
    }
    let rows = x.numel();
    let cols = match columns {
        None => rows,
        Some(n) => usize::try_from(n)
            .map_err(|_| KernelError::Invalid(format!("N must be non-negative, got {n}")))?,
    };
    let shape = checked_shape(&[rows, cols])?;
    let mut data = Vec::with_capacity(shape.numel());
    for &v in x.data() {
        for j in 0..cols {
            let power = if increasing { j } else { cols - 1 - j };
            data.push(v.powi(power as i32));
        }
    }
    Ok(Dense::from_parts(shape, data))
}
