//! Vector, matrix and layer norms

use super::dense::Dense;
use super::jacobi::one_sided_svd;
use super::{KernelError, axis_index};
use crate::tensor::Shape;
use crate::value::Value;

/// Resolve axes, rejecting duplicates
fn resolve_axes(axes: &[i64], ndim: usize) -> Result<Vec<usize>, KernelError> {
    let mut resolved = Vec::with_capacity(axes.len());
    for &a in axes {
        let axis = axis_index(a, ndim)?;
        if resolved.contains(&axis) {
            return Err(KernelError::Invalid(format!("repeated axis {a}")));
        }
        resolved.push(axis);
    }
    Ok(resolved)
}

/// Permute `x` so the `reduced` axes come last; returns the permuted tensor,
/// the permutation and the reduced block size
fn split_axes(x: &Dense, reduced: &[usize]) -> (Dense, Vec<usize>, usize) {
    let perm: Vec<usize> = (0..x.ndim())
        .filter(|a| !reduced.contains(a))
        .chain(reduced.iter().copied())
        .collect();
    let block = reduced.iter().map(|&a| x.shape()[a]).product();
    (x.permute(&perm), perm, block)
}

/// Output shape of a reduction over `reduced`
fn reduced_shape(shape: &[usize], reduced: &[usize], keepdims: bool) -> Shape {
    shape
        .iter()
        .enumerate()
        .filter_map(|(i, &d)| match (reduced.contains(&i), keepdims) {
            (false, _) => Some(d),
            (true, true) => Some(1),
            (true, false) => None,
        })
        .collect()
}

/// Reduce each block of `block` consecutive values
fn reduce_blocks(data: &[f64], block: usize, outputs: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    if block == 0 {
        return vec![f(&[]); outputs];
    }
    data.chunks_exact(block).map(f).collect()
}

fn ord_number(ord: &Value) -> Option<f64> {
    match ord {
        Value::Str(s) if s == "inf" => Some(f64::INFINITY),
        Value::Str(s) if s == "-inf" => Some(f64::NEG_INFINITY),
        v => v.as_f64(),
    }
}

/// p-norm of one block of values
fn p_norm(values: &[f64], p: f64) -> f64 {
    let abs = values.iter().map(|v| v.abs());
    if p == f64::INFINITY {
        abs.fold(0.0, f64::max)
    } else if p == f64::NEG_INFINITY {
        abs.fold(f64::INFINITY, f64::min)
    } else if p == 0.0 {
        abs.filter(|&v| v != 0.0).count() as f64
    } else if p == 1.0 {
        abs.sum()
    } else if p == 2.0 {
        abs.map(|v| v * v).sum::<f64>().sqrt()
    } else {
        abs.map(|v| v.powf(p)).sum::<f64>().powf(1.0 / p)
    }
}

/// Vector norm over `axis` (every axis when `None`)
pub fn vector_norm(
    x: &Dense,
    axis: Option<&[i64]>,
    keepdims: bool,
    ord: &Value,
) -> Result<Dense, KernelError> {
    let p = ord_number(ord).ok_or_else(|| {
        KernelError::Invalid(format!("unsupported vector norm order {ord:?}"))
    })?;
    let reduced = match axis {
        Some(axes) => resolve_axes(axes, x.ndim())?,
        None => (0..x.ndim()).collect(),
    };
    let (permuted, _, block) = split_axes(x, &reduced);
    let shape = reduced_shape(x.shape(), &reduced, keepdims);
    let data = reduce_blocks(permuted.data(), block, shape.numel(), |v| p_norm(v, p));
    Ok(Dense::from_parts(shape, data))
}

enum MatrixOrd {
    Frobenius,
    Nuclear,
    /// Column sums (`1`) or row sums (`inf`), max or min
    AbsSum { rows: bool, max: bool },
    /// Largest or smallest singular value
    Spectral { max: bool },
}

impl MatrixOrd {
    fn parse(ord: &Value) -> Result<Self, KernelError> {
        let parsed = match ord {
            Value::Str(s) if s == "fro" => Some(Self::Frobenius),
            Value::Str(s) if s == "nuc" => Some(Self::Nuclear),
            other => ord_number(other).and_then(|p| match p {
                p if p == 1.0 => Some(Self::AbsSum { rows: false, max: true }),
                p if p == -1.0 => Some(Self::AbsSum { rows: false, max: false }),
                p if p == f64::INFINITY => Some(Self::AbsSum { rows: true, max: true }),
                p if p == f64::NEG_INFINITY => Some(Self::AbsSum { rows: true, max: false }),
                p if p == 2.0 => Some(Self::Spectral { max: true }),
                p if p == -2.0 => Some(Self::Spectral { max: false }),
                _ => None,
            }),
        };
        parsed.ok_or_else(|| KernelError::Invalid(format!("unsupported matrix norm order {ord:?}")))
    }

    fn apply(&self, a: &[f64], m: usize, n: usize) -> f64 {
        match *self {
            Self::Frobenius => a.iter().map(|v| v * v).sum::<f64>().sqrt(),
            Self::Nuclear => singular_values(a, m, n).iter().sum(),
            Self::Spectral { max } => {
                let s = singular_values(a, m, n);
                if max {
                    s.first().copied().unwrap_or(0.0)
                } else {
                    s.last().copied().unwrap_or(0.0)
                }
            }
            Self::AbsSum { rows, max } => {
                let sums: Vec<f64> = if rows {
                    (0..m).map(|i| (0..n).map(|j| a[i * n + j].abs()).sum()).collect()
                } else {
                    (0..n).map(|j| (0..m).map(|i| a[i * n + j].abs()).sum()).collect()
                };
                let init = if max { 0.0 } else { f64::INFINITY };
                sums.into_iter()
                    .fold(init, |acc, v| if max { acc.max(v) } else { acc.min(v) })
            }
        }
    }
}

fn singular_values(a: &[f64], m: usize, n: usize) -> Vec<f64> {
    if m >= n {
        one_sided_svd(a, m, n).1
    } else {
        let mut t = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                t[j * m + i] = a[i * n + j];
            }
        }
        one_sided_svd(&t, n, m).1
    }
}

/// Matrix norm over the two axes in `axis`
pub fn matrix_norm(
    x: &Dense,
    ord: &Value,
    axis: &[i64],
    keepdims: bool,
) -> Result<Dense, KernelError> {
    let kind = MatrixOrd::parse(ord)?;
    if axis.len() != 2 {
        return Err(KernelError::Invalid(format!(
            "matrix norm needs exactly two axes, got {}",
            axis.len()
        )));
    }
    x.require_rank(2)?;
    let reduced = resolve_axes(axis, x.ndim())?;
    let (permuted, _, _) = split_axes(x, &reduced);
    let (m, n) = (x.shape()[reduced[0]], x.shape()[reduced[1]]);
    let shape = reduced_shape(x.shape(), &reduced, keepdims);
    let data = reduce_blocks(permuted.data(), m * n, shape.numel(), |a| kind.apply(a, m, n));
    Ok(Dense::from_parts(shape, data))
}

/// Normalize over `normalized_idxs` to zero mean and `new_std` standard
/// deviation, then scale by `weight` and shift by `bias`.
///
/// `weight` and `bias` broadcast against `x`.
pub fn layer_norm(
    x: &Dense,
    normalized_idxs: &[i64],
    weight: Option<&Dense>,
    bias: Option<&Dense>,
    epsilon: f64,
    new_std: f64,
) -> Result<Dense, KernelError> {
    let reduced = resolve_axes(normalized_idxs, x.ndim())?;
    let (permuted, perm, block) = split_axes(x, &reduced);

    let mut data = Vec::with_capacity(x.numel());
    if block > 0 {
        for chunk in permuted.data().chunks_exact(block) {
            let count = block as f64;
            let mean = chunk.iter().sum::<f64>() / count;
            let var = chunk.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count;
            let scale = new_std / (var + epsilon).sqrt();
            data.extend(chunk.iter().map(|v| (v - mean) * scale));
        }
    }
    let normalized = Dense::from_parts(permuted.shape().clone(), data);

    let mut inverse = vec![0usize; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        inverse[p] = i;
    }
    let mut y = normalized.permute(&inverse);

    if let Some(w) = weight {
        let w = w.broadcast_to(x.shape())?;
        y = Dense::from_parts(
            y.shape().clone(),
            y.data().iter().zip(w.data()).map(|(a, b)| a * b).collect(),
        );
    }
    if let Some(b) = bias {
        let b = b.broadcast_to(x.shape())?;
        y = Dense::from_parts(
            y.shape().clone(),
            y.data().iter().zip(b.data()).map(|(a, b)| a + b).collect(),
        );
    }
    Ok(y)
}
