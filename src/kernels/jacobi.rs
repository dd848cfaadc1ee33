//! Jacobi rotations for the symmetric eigensolver and the SVD
//!
//! Both solvers operate on a single row-major matrix. The rotation parameters
//! use the LAPACK formula that avoids catastrophic cancellation.

const MAX_SWEEPS: usize = 50;

/// Plane rotation `[[c, s], [-s, c]]` acting on a pair of columns
#[derive(Debug, Clone, Copy)]
pub(crate) struct Rotation {
    pub c: f64,
    pub s: f64,
}

impl Rotation {
    const IDENTITY: Self = Self { c: 1.0, s: 0.0 };

    /// Rotation that diagonalizes the symmetric block `[[a_pp, a_pq], [a_pq, a_qq]]`.
    ///
    /// Takes the smaller of the two roots of `t² + 2θt - 1 = 0`, where
    /// `θ = (a_qq - a_pp) / 2a_pq`, so that `|t| <= 1`.
    #[inline]
    pub fn annihilating(a_pp: f64, a_qq: f64, a_pq: f64) -> Self {
        if a_pq.abs() < 1e-300 {
            return Self::IDENTITY;
        }
        let theta = (a_qq - a_pp) / (2.0 * a_pq);
        let t = 1.0f64.copysign(theta) / (theta.abs() + theta.hypot(1.0));
        let c = t.hypot(1.0).recip();
        Self { c, s: t * c }
    }

    /// Rotate columns `p` and `q` of a row-major matrix `cols` wide
    #[inline]
    fn apply_columns(self, data: &mut [f64], cols: usize, p: usize, q: usize) {
        for row in data.chunks_exact_mut(cols) {
            let (x, y) = (row[p], row[q]);
            row[p] = self.c * x - self.s * y;
            row[q] = self.s * x + self.c * y;
        }
    }

    /// `A <- R^T A R` on a symmetric `n x n` matrix; `A[p][q]` becomes zero
    fn apply_similarity(self, a: &mut [f64], n: usize, p: usize, q: usize) {
        let Self { c, s } = self;
        let at = |i: usize, j: usize| i * n + j;
        let (pp, qq, pq) = (a[at(p, p)], a[at(q, q)], a[at(p, q)]);

        for k in (0..n).filter(|&k| k != p && k != q) {
            let (kp, kq) = (a[at(k, p)], a[at(k, q)]);
            let rp = c * kp - s * kq;
            let rq = s * kp + c * kq;
            a[at(k, p)] = rp;
            a[at(p, k)] = rp;
            a[at(k, q)] = rq;
            a[at(q, k)] = rq;
        }

        let cross = 2.0 * c * s * pq;
        a[at(p, p)] = c * c * pp - cross + s * s * qq;
        a[at(q, q)] = s * s * pp + cross + c * c * qq;
        a[at(p, q)] = 0.0;
        a[at(q, p)] = 0.0;
    }
}

/// Entries `(p,p)`, `(q,q)` and `(p,q)` of `B^T B`
#[inline]
fn column_gram(b: &[f64], cols: usize, p: usize, q: usize) -> (f64, f64, f64) {
    b.chunks_exact(cols).fold((0.0, 0.0, 0.0), |(pp, qq, pq), row| {
        let (x, y) = (row[p], row[q]);
        (pp + x * x, qq + y * y, pq + x * y)
    })
}

/// Permutation that sorts `values`, largest first when `descending`
fn sort_order(values: &[f64], descending: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    if descending {
        order.sort_by(|&i, &j| values[j].total_cmp(&values[i]));
    } else {
        order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));
    }
    order
}

/// Gather columns of a row-major matrix `cols` wide in `order`
fn gather_columns(data: &[f64], cols: usize, order: &[usize]) -> Vec<f64> {
    if cols == 0 {
        return Vec::new();
    }
    data.chunks_exact(cols)
        .flat_map(|row| order.iter().map(move |&j| row[j]))
        .collect()
}

/// `n x n` identity
pub(crate) fn identity_matrix(n: usize) -> Vec<f64> {
    (0..n * n).map(|k| if k % (n + 1) == 0 { 1.0 } else { 0.0 }).collect()
}

/// Normalize columns in place, returning their norms; columns with norm
/// at or below `eps` are zeroed.
fn normalize_columns(data: &mut [f64], rows: usize, cols: usize, eps: f64) -> Vec<f64> {
    let mut norms = vec![0.0; cols];
    for j in 0..cols {
        let norm = (0..rows)
            .map(|i| data[i * cols + j] * data[i * cols + j])
            .sum::<f64>()
            .sqrt();
        norms[j] = norm;
        for i in 0..rows {
            data[i * cols + j] = if norm > eps { data[i * cols + j] / norm } else { 0.0 };
        }
    }
    norms
}

/// Eigendecomposition of a symmetric `n x n` matrix (two-sided Jacobi).
///
/// Returns eigenvalues in ascending order and the matching eigenvectors as
/// columns of a row-major `n x n` matrix.
pub(crate) fn symmetric_eigen(a: &[f64], n: usize) -> (Vec<f64>, Vec<f64>) {
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    let mut work = a.to_vec();
    let mut v = identity_matrix(n);

    let scale = a.iter().fold(0.0f64, |m, x| m.max(x.abs())).max(f64::MIN_POSITIVE);
    let tol = (n as f64) * f64::EPSILON * scale;

    for _ in 0..MAX_SWEEPS {
        let off_diag = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .fold(0.0f64, |m, (i, j)| m.max(work[i * n + j].abs()));
        if off_diag < tol {
            break;
        }

        for p in 0..n {
            for q in p + 1..n {
                let a_pq = work[p * n + q];
                if a_pq.abs() < tol {
                    continue;
                }
                let rot = Rotation::annihilating(work[p * n + p], work[q * n + q], a_pq);
                rot.apply_similarity(&mut work, n, p, q);
                rot.apply_columns(&mut v, n, p, q);
            }
        }
    }

    let eigenvalues: Vec<f64> = (0..n).map(|i| work[i * n + i]).collect();
    let order = sort_order(&eigenvalues, false);
    let sorted = order.iter().map(|&i| eigenvalues[i]).collect();
    (sorted, gather_columns(&v, n, &order))
}

/// Thin SVD of an `m x n` matrix with `m >= n` (one-sided Jacobi).
///
/// Returns `(U [m x n], S [n], V [n x n])` with singular values descending;
/// `A = U diag(S) V^T`. Columns of `U` belonging to zero singular values are
/// zero and must be completed by the caller when an orthonormal basis is
/// needed.
pub(crate) fn one_sided_svd(a: &[f64], m: usize, n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    debug_assert!(m >= n);
    if n == 0 {
        return (Vec::new(), Vec::new(), Vec::new());
    }
    let mut b = a.to_vec();
    let mut v = identity_matrix(n);

    let tol = (m.max(n) as f64) * f64::EPSILON;

    for _ in 0..MAX_SWEEPS {
        let mut rotated = false;
        for p in 0..n {
            for q in p + 1..n {
                let (a_pp, a_qq, a_pq) = column_gram(&b, n, p, q);
                if a_pq == 0.0 || a_pq.abs() <= tol * (a_pp * a_qq).sqrt() {
                    continue;
                }
                rotated = true;
                let rot = Rotation::annihilating(a_pp, a_qq, a_pq);
                rot.apply_columns(&mut b, n, p, q);
                rot.apply_columns(&mut v, n, p, q);
            }
        }
        if !rotated {
            break;
        }
    }

    let scale = a.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
    let norms = normalize_columns(&mut b, m, n, f64::EPSILON * scale * (m as f64));
    let order = sort_order(&norms, true);
    let s: Vec<f64> = order.iter().map(|&i| norms[i]).collect();
    (gather_columns(&b, n, &order), s, gather_columns(&v, n, &order))
}

/// Complete the first `k` orthonormal columns of an `rows x cols` matrix to an
/// orthonormal basis, replacing zero columns and filling columns `k..cols`.
///
/// Uses Gram-Schmidt against the standard basis vectors.
pub(crate) fn complete_orthonormal_columns(q: &mut [f64], rows: usize, cols: usize) {
    let mut basis_candidate = 0;
    for j in 0..cols {
        let norm: f64 = (0..rows).map(|i| q[i * cols + j] * q[i * cols + j]).sum::<f64>().sqrt();
        if norm > 0.5 {
            continue;
        }
        // Find a unit vector e_c with a component outside the current span
        while basis_candidate < rows {
            let mut vec = vec![0.0; rows];
            vec[basis_candidate] = 1.0;
            basis_candidate += 1;
            for _ in 0..2 {
                for other in 0..cols {
                    if other == j {
                        continue;
                    }
                    let dot: f64 = (0..rows).map(|i| q[i * cols + other] * vec[i]).sum();
                    for (i, slot) in vec.iter_mut().enumerate() {
                        *slot -= dot * q[i * cols + other];
                    }
                }
            }
            let len = vec.iter().map(|x| x * x).sum::<f64>().sqrt();
            if len > 1e-8 {
                for (i, x) in vec.iter().enumerate() {
                    q[i * cols + j] = x / len;
                }
                break;
            }
        }
    }
}
