//! Matrix decompositions and the operations built on them
//!
//! Every function accepts a batch of matrices `(..., m, n)` and handles each
//! matrix independently through [`map_batches`].

use super::dense::{Dense, broadcast_dims};
use super::jacobi::{complete_orthonormal_columns, identity_matrix, one_sided_svd, symmetric_eigen};
use super::linalg::matmul_2d;
use super::{KernelError, map_batches};
use crate::tensor::Shape;

/// LU factorization with partial pivoting (Doolittle), `P A = L U`
struct Lu {
    /// `L` below the diagonal (unit diagonal implied), `U` on and above
    lu: Vec<f64>,
    /// Row `i` of `P A` is row `perm[i]` of `A`
    perm: Vec<usize>,
    /// Determinant of `P`
    sign: f64,
    /// Largest absolute input entry, for singularity thresholds
    scale: f64,
}

impl Lu {
    fn factor(a: &[f64], n: usize) -> Self {
        let mut lu = a.to_vec();
        let mut perm: Vec<usize> = (0..n).collect();
        let mut sign = 1.0;
        let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs()));

        for col in 0..n {
            // Pivot: max absolute value in column col, rows col..n
            let mut pivot_row = col;
            let mut max_val = lu[col * n + col].abs();
            for row in (col + 1)..n {
                let val = lu[row * n + col].abs();
                if val > max_val {
                    max_val = val;
                    pivot_row = row;
                }
            }

            if pivot_row != col {
                for j in 0..n {
                    lu.swap(col * n + j, pivot_row * n + j);
                }
                perm.swap(col, pivot_row);
                sign = -sign;
            }

            let pivot = lu[col * n + col];
            if pivot == 0.0 {
                continue;
            }

            for row in (col + 1)..n {
                lu[row * n + col] /= pivot;
            }
            for row in (col + 1)..n {
                let multiplier = lu[row * n + col];
                for j in (col + 1)..n {
                    lu[row * n + j] -= multiplier * lu[col * n + j];
                }
            }
        }

        Self {
            lu,
            perm,
            sign,
            scale,
        }
    }

    fn pivots(&self, n: usize) -> impl Iterator<Item = f64> + '_ {
        (0..n).map(move |i| self.lu[i * n + i])
    }

    /// Reject matrices whose smallest pivot is below `n * eps * max|a|`;
    /// the empty matrix is its own inverse
    fn check_invertible(&self, n: usize) -> Result<(), KernelError> {
        if n == 0 {
            return Ok(());
        }
        let threshold = n as f64 * f64::EPSILON * self.scale;
        if self.scale == 0.0 || self.pivots(n).any(|p| p.abs() <= threshold) {
            return Err(KernelError::Singular);
        }
        Ok(())
    }

    /// Solve `A X = B` for `B` of shape `n x k`
    fn solve(&self, b: &[f64], n: usize, k: usize) -> Vec<f64> {
        let mut x = vec![0.0; n * k];
        for i in 0..n {
            x[i * k..(i + 1) * k].copy_from_slice(&b[self.perm[i] * k..(self.perm[i] + 1) * k]);
        }
        // Forward substitution with unit L
        for i in 0..n {
            for p in 0..i {
                let l = self.lu[i * n + p];
                if l != 0.0 {
                    for j in 0..k {
                        x[i * k + j] -= l * x[p * k + j];
                    }
                }
            }
        }
        // Back substitution with U
        for i in (0..n).rev() {
            for p in (i + 1)..n {
                let u = self.lu[i * n + p];
                if u != 0.0 {
                    for j in 0..k {
                        x[i * k + j] -= u * x[p * k + j];
                    }
                }
            }
            let d = self.lu[i * n + i];
            for j in 0..k {
                x[i * k + j] /= d;
            }
        }
        x
    }
}

fn transpose(a: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut t = vec![0.0; rows * cols];
    for i in 0..rows {
        for j in 0..cols {
            t[j * rows + i] = a[i * cols + j];
        }
    }
    t
}

fn with_dims(batch: &Shape, dims: &[usize]) -> Shape {
    let mut shape = batch.clone();
    shape.extend_from_slice(dims);
    shape
}

/// Determinant of each square matrix
pub fn det(x: &Dense) -> Result<Dense, KernelError> {
    let (batch, n) = x.square_dims()?;
    let dets = map_batches(batch.numel(), |b| {
        let lu = Lu::factor(x.matrix(b, n, n), n);
        Ok(lu.sign * lu.pivots(n).product::<f64>())
    })?;
    Ok(Dense::from_parts(batch, dets))
}

/// Sign and natural log of the absolute determinant.
///
/// A singular matrix yields sign `0` and `-inf`.
pub fn slogdet(x: &Dense) -> Result<(Dense, Dense), KernelError> {
    let (batch, n) = x.square_dims()?;
    let pairs = map_batches(batch.numel(), |b| {
        let lu = Lu::factor(x.matrix(b, n, n), n);
        let mut sign = lu.sign;
        let mut logabs = 0.0;
        for p in lu.pivots(n) {
            if p == 0.0 {
                return Ok((0.0, f64::NEG_INFINITY));
            }
            sign *= p.signum();
            logabs += p.abs().ln();
        }
        Ok((sign, logabs))
    })?;
    let (signs, logs): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
    Ok((
        Dense::from_parts(batch.clone(), signs),
        Dense::from_parts(batch, logs),
    ))
}

/// Inverse of each square matrix (of its transpose when `adjoint`)
pub fn inv(x: &Dense, adjoint: bool) -> Result<Dense, KernelError> {
    let x = if adjoint { x.transpose_last2()? } else { x.clone() };
    let (batch, n) = x.square_dims()?;
    let eye = identity_matrix(n);
    let inverses = map_batches(batch.numel(), |b| {
        let lu = Lu::factor(x.matrix(b, n, n), n);
        lu.check_invertible(n)?;
        Ok(lu.solve(&eye, n, n))
    })?;
    Ok(Dense::from_parts(x.shape().clone(), inverses.concat()))
}

/// Solve `x1 @ X = x2`.
///
/// A 1-D `x2` is a single right-hand side; otherwise `x2` is `(..., n, k)`.
/// Batch dimensions broadcast.
pub fn solve(x1: &Dense, x2: &Dense, adjoint: bool) -> Result<Dense, KernelError> {
    let a = if adjoint { x1.transpose_last2()? } else { x1.clone() };
    let (a_batch, n) = a.square_dims()?;

    let vector_rhs = x2.ndim() == 1;
    let rhs = if vector_rhs {
        x2.clone().reshape([x2.numel(), 1])?
    } else {
        x2.clone()
    };
    let (b_batch, rows, k) = rhs.matrix_dims()?;
    if rows != n {
        return Err(KernelError::Shape {
            lhs: x1.shape().to_vec(),
            rhs: x2.shape().to_vec(),
        });
    }

    let batch = broadcast_dims(&a_batch, &b_batch)?;
    let a = a.broadcast_to(&with_dims(&batch, &[n, n]))?;
    let rhs = rhs.broadcast_to(&with_dims(&batch, &[n, k]))?;

    let solutions = map_batches(batch.numel(), |b| {
        let lu = Lu::factor(a.matrix(b, n, n), n);
        lu.check_invertible(n)?;
        Ok(lu.solve(rhs.matrix(b, n, k), n, k))
    })?;

    let shape = if vector_rhs {
        with_dims(&batch, &[n])
    } else {
        with_dims(&batch, &[n, k])
    };
    Ok(Dense::from_parts(shape, solutions.concat()))
}

/// Cholesky factor from the lower triangle (Cholesky-Banachiewicz)
pub fn cholesky(x: &Dense, upper: bool) -> Result<Dense, KernelError> {
    let (batch, n) = x.square_dims()?;
    let factors = map_batches(batch.numel(), |b| {
        let a = x.matrix(b, n, n);
        let mut l = vec![0.0; n * n];
        for i in 0..n {
            let sum_sq: f64 = (0..i).map(|k| l[i * n + k] * l[i * n + k]).sum();
            let diag = a[i * n + i] - sum_sq;
            if diag <= 0.0 || diag.is_nan() {
                return Err(KernelError::NotPositiveDefinite);
            }
            l[i * n + i] = diag.sqrt();

            for j in (i + 1)..n {
                let sum_prod: f64 = (0..i).map(|k| l[j * n + k] * l[i * n + k]).sum();
                l[j * n + i] = (a[j * n + i] - sum_prod) / l[i * n + i];
            }
        }
        Ok(if upper { transpose(&l, n, n) } else { l })
    })?;
    Ok(Dense::from_parts(x.shape().clone(), factors.concat()))
}

/// Full Householder QR of one `m x n` matrix: `Q` is `m x m`, `R` is `m x n`
fn householder_qr(a: &[f64], m: usize, n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut r = a.to_vec();
    let mut q = identity_matrix(m);

    for col in 0..m.min(n) {
        let x_len = m - col;
        let x: Vec<f64> = (0..x_len).map(|i| r[(col + i) * n + col]).collect();
        let norm_x = x.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm_x < f64::EPSILON {
            continue;
        }

        // alpha = -sign(x[0]) * ||x||
        let alpha = if x[0] >= 0.0 { -norm_x } else { norm_x };
        let mut v = x;
        v[0] -= alpha;
        let v_norm = v.iter().map(|v| v * v).sum::<f64>().sqrt();
        if v_norm < f64::EPSILON {
            continue;
        }
        for val in &mut v {
            *val /= v_norm;
        }

        // R[col:m, col:n] -= 2 v (v^T R[col:m, col:n])
        for j in col..n {
            let w: f64 = (0..x_len).map(|i| v[i] * r[(col + i) * n + j]).sum();
            for i in 0..x_len {
                r[(col + i) * n + j] -= 2.0 * v[i] * w;
            }
        }

        // Q[:, col:m] = Q[:, col:m] (I - 2 v v^T)
        for row in 0..m {
            let dot: f64 = (0..x_len).map(|i| q[row * m + col + i] * v[i]).sum();
            for i in 0..x_len {
                q[row * m + col + i] -= 2.0 * dot * v[i];
            }
        }
    }

    // Clear rounding noise below the diagonal
    for i in 0..m {
        for j in 0..i.min(n) {
            r[i * n + j] = 0.0;
        }
    }
    (q, r)
}

/// QR decomposition; `mode` is `"reduced"` or `"complete"`
pub fn qr(x: &Dense, mode: &str) -> Result<(Dense, Dense), KernelError> {
    let complete = match mode {
        "reduced" => false,
        "complete" => true,
        other => {
            return Err(KernelError::Invalid(format!(
                "qr mode must be 'reduced' or 'complete', got '{other}'"
            )));
        }
    };
    let (batch, m, n) = x.matrix_dims()?;
    let k = m.min(n);
    let (q_cols, r_rows) = if complete { (m, m) } else { (k, k) };

    let parts = map_batches(batch.numel(), |b| {
        let (q, r) = householder_qr(x.matrix(b, m, n), m, n);
        let q: Vec<f64> = (0..m)
            .flat_map(|i| q[i * m..i * m + q_cols].iter().copied())
            .collect();
        let r = r[..r_rows * n].to_vec();
        Ok((q, r))
    })?;
    let (qs, rs): (Vec<_>, Vec<_>) = parts.into_iter().unzip();
    Ok((
        Dense::from_parts(with_dims(&batch, &[m, q_cols]), qs.concat()),
        Dense::from_parts(with_dims(&batch, &[r_rows, n]), rs.concat()),
    ))
}

/// Eigenvalues (ascending) and eigenvectors of symmetric matrices, reading
/// the triangle named by `uplo`
pub fn eigh(x: &Dense, uplo: &str) -> Result<(Dense, Dense), KernelError> {
    let lower = match uplo {
        "L" | "l" => true,
        "U" | "u" => false,
        other => {
            return Err(KernelError::Invalid(format!(
                "uplo must be 'L' or 'U', got '{other}'"
            )));
        }
    };
    let (batch, n) = x.square_dims()?;
    let parts = map_batches(batch.numel(), |b| {
        let a = x.matrix(b, n, n);
        let mut sym = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                let from_lower = if i >= j { a[i * n + j] } else { a[j * n + i] };
                let from_upper = if i <= j { a[i * n + j] } else { a[j * n + i] };
                sym[i * n + j] = if lower { from_lower } else { from_upper };
            }
        }
        Ok(symmetric_eigen(&sym, n))
    })?;
    let (values, vectors): (Vec<_>, Vec<_>) = parts.into_iter().unzip();
    Ok((
        Dense::from_parts(with_dims(&batch, &[n]), values.concat()),
        Dense::from_parts(x.shape().clone(), vectors.concat()),
    ))
}

/// Copy into a wider matrix, zero-filling new columns
fn pad_columns(a: &[f64], rows: usize, cols: usize, new_cols: usize) -> Vec<f64> {
    let mut out = vec![0.0; rows * new_cols];
    for i in 0..rows {
        out[i * new_cols..i * new_cols + cols].copy_from_slice(&a[i * cols..(i + 1) * cols]);
    }
    out
}

/// Thin SVD of one `m x n` matrix: `U [m x k]`, `S [k]`, `V [n x k]`, with
/// `k = min(m, n)`
fn thin_svd(a: &[f64], m: usize, n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    if m >= n {
        one_sided_svd(a, m, n)
    } else {
        // A^T = U' S V'^T, so A = V' S U'^T
        let (u_t, s, v_t) = one_sided_svd(&transpose(a, m, n), n, m);
        (v_t, s, u_t)
    }
}

/// Singular value decomposition; `U` and `Vh` are square when `full_matrices`
pub fn svd(x: &Dense, full_matrices: bool) -> Result<(Dense, Dense, Dense), KernelError> {
    let (batch, m, n) = x.matrix_dims()?;
    let k = m.min(n);
    let (u_cols, v_cols) = if full_matrices { (m, n) } else { (k, k) };

    let parts = map_batches(batch.numel(), |b| {
        let (u, s, v) = thin_svd(x.matrix(b, m, n), m, n);
        let mut u = pad_columns(&u, m, k, u_cols);
        complete_orthonormal_columns(&mut u, m, u_cols);
        let mut v = pad_columns(&v, n, k, v_cols);
        complete_orthonormal_columns(&mut v, n, v_cols);
        Ok((u, s, transpose(&v, n, v_cols)))
    })?;

    let mut us = Vec::with_capacity(parts.len());
    let mut ss = Vec::with_capacity(parts.len());
    let mut vhs = Vec::with_capacity(parts.len());
    for (u, s, vh) in parts {
        us.push(u);
        ss.push(s);
        vhs.push(vh);
    }
    Ok((
        Dense::from_parts(with_dims(&batch, &[m, u_cols]), us.concat()),
        Dense::from_parts(with_dims(&batch, &[k]), ss.concat()),
        Dense::from_parts(with_dims(&batch, &[v_cols, n]), vhs.concat()),
    ))
}

/// Singular values in descending order
pub fn svdvals(x: &Dense) -> Result<Dense, KernelError> {
    let (batch, m, n) = x.matrix_dims()?;
    let values = map_batches(batch.numel(), |b| Ok(thin_svd(x.matrix(b, m, n), m, n).1))?;
    Ok(Dense::from_parts(
        with_dims(&batch, &[m.min(n)]),
        values.concat(),
    ))
}

/// Moore-Penrose pseudo-inverse; singular values at or below
/// `rtol * max(s)` are treated as zero
pub fn pinv(x: &Dense, rtol: Option<f64>) -> Result<Dense, KernelError> {
    let (batch, m, n) = x.matrix_dims()?;
    let k = m.min(n);
    let rtol = rtol.unwrap_or(f64::EPSILON * m.max(n) as f64);

    let inverses = map_batches(batch.numel(), |b| {
        let (u, s, v) = thin_svd(x.matrix(b, m, n), m, n);
        let cutoff = rtol * s.first().copied().unwrap_or(0.0);
        // V diag(1/s) U^T, shape n x m
        let mut scaled = v;
        for (j, &sj) in s.iter().enumerate() {
            let inv_s = if sj > cutoff { 1.0 / sj } else { 0.0 };
            for i in 0..n {
                scaled[i * k + j] *= inv_s;
            }
        }
        Ok(matmul_2d(&scaled, &transpose(&u, m, k), n, k, m))
    })?;
    Ok(Dense::from_parts(with_dims(&batch, &[n, m]), inverses.concat()))
}

/// Number of singular values above `max(atol, rtol * max(s))`.
///
/// Without either tolerance, `rtol` is `eps * max(m, n)`; with only `atol`,
/// `rtol` is zero.
pub fn matrix_rank(x: &Dense, atol: Option<f64>, rtol: Option<f64>) -> Result<Dense, KernelError> {
    let (batch, m, n) = x.matrix_dims()?;
    let rtol = match (atol, rtol) {
        (_, Some(r)) => r,
        (None, None) => f64::EPSILON * m.max(n) as f64,
        (Some(_), None) => 0.0,
    };
    let atol = atol.unwrap_or(0.0);

    let ranks = map_batches(batch.numel(), |b| {
        let s = thin_svd(x.matrix(b, m, n), m, n).1;
        let smax = s.first().copied().unwrap_or(0.0);
        let tol = atol.max(rtol * smax);
        Ok(s.iter().filter(|&&v| v > tol).count() as f64)
    })?;
    Ok(Dense::from_parts(batch, ranks))
}

/// Integer power of square matrices by repeated squaring; negative powers
/// invert first
pub fn matrix_power(x: &Dense, power: i64) -> Result<Dense, KernelError> {
    let (batch, n) = x.square_dims()?;
    let base = if power < 0 { inv(x, false)? } else { x.clone() };
    let exp = power.unsigned_abs();

    let results = map_batches(batch.numel(), |b| {
        let mut result = identity_matrix(n);
        let mut square = base.matrix(b, n, n).to_vec();
        let mut e = exp;
        while e > 0 {
            if e & 1 == 1 {
                result = matmul_2d(&result, &square, n, n, n);
            }
            e >>= 1;
            if e > 0 {
                square = matmul_2d(&square, &square, n, n, n);
            }
        }
        Ok(result)
    })?;
    Ok(Dense::from_parts(x.shape().clone(), results.concat()))
}
