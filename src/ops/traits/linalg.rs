//! Linear algebra operations trait
//!
//! This module defines the trait for the unified linear algebra surface:
//! - Decompositions (Cholesky, QR, SVD, symmetric eigendecomposition)
//! - Solving linear systems and inverses (solve, inv, pinv)
//! - Matrix properties (det, slogdet, rank, trace, norms)
//! - Products and structural helpers (matmul, tensordot, diag, vander, ...)

use super::{Dispatch, finish};
use crate::dispatch::OpKind;
use crate::error::Result;
use crate::ops::{Eigh, NormOrd, Operand, Qr, QrMode, Slogdet, Svd, TensordotAxes, Uplo};
use crate::tensor::Array;

/// Linear algebra operations
///
/// Matrix operations act on the last two axes and batch over the leading
/// ones. Calling a method with a [`crate::value::Container`] applies it to
/// every leaf. Record-returning decompositions take a single [`Array`]; use
/// [`crate::value::Container::apply`] to broadcast them.
///
/// Options not exposed here (`out`, `adjoint`, transposed matmul operands)
/// are available through [`Dispatch::call`].
///
/// # Errors
///
/// Every method fails with:
/// - `NoBackendSelected` if no backend is active
/// - `UnsupportedDType` if the backend lists the operand dtype as unsupported
/// - `ShapeMismatch` if operand shapes are incompatible
/// - `BackendKernel` if the kernel rejects its input otherwise (a singular
///   matrix, too few dimensions, ...)
pub trait LinalgOps: Dispatch {
    /// Cholesky factor of a symmetric positive-definite matrix
    ///
    /// Returns `L` with `A = L @ L^T`, or `U = L^T` when `upper` is set.
    /// Fails with `BackendKernel` (not positive definite) otherwise.
    fn cholesky<T: Operand>(&self, x: &T, upper: bool) -> Result<T> {
        finish(
            OpKind::Cholesky,
            self.call(OpKind::Cholesky).arg(x.to_value()).kwarg("upper", upper),
        )
    }

    /// Cross product of 3-vectors along `axis`, broadcasting the other axes
    fn cross<T: Operand>(&self, x1: &T, x2: &T, axis: i64) -> Result<T> {
        finish(
            OpKind::Cross,
            self.call(OpKind::Cross)
                .arg(x1.to_value())
                .arg(x2.to_value())
                .kwarg("axis", axis),
        )
    }

    /// Determinant
    fn det<T: Operand>(&self, x: &T) -> Result<T> {
        finish(OpKind::Det, self.call(OpKind::Det).arg(x.to_value()))
    }

    /// Build a diagonal matrix from a vector, or extract a diagonal from a
    /// matrix.
    ///
    /// For vector input, the result is square with side `n + |offset|`
    /// unless `num_rows` / `num_cols` say otherwise; cells off the diagonal
    /// hold `padding_value`.
    fn diag<T: Operand>(
        &self,
        x: &T,
        offset: i64,
        padding_value: f64,
        num_rows: Option<usize>,
        num_cols: Option<usize>,
    ) -> Result<T> {
        finish(
            OpKind::Diag,
            self.call(OpKind::Diag)
                .arg(x.to_value())
                .arg(offset)
                .arg(padding_value)
                .arg(num_rows)
                .arg(num_cols),
        )
    }

    /// Diagonal of the `axis1`/`axis2` planes, appended as the last axis
    fn diagonal<T: Operand>(&self, x: &T, offset: i64, axis1: i64, axis2: i64) -> Result<T> {
        finish(
            OpKind::Diagonal,
            self.call(OpKind::Diagonal)
                .arg(x.to_value())
                .arg(offset)
                .arg(axis1)
                .arg(axis2),
        )
    }

    /// Eigendecomposition of a symmetric matrix, reading the `uplo` triangle
    ///
    /// Eigenvalues are ascending; eigenvectors are the columns of
    /// `eigenvectors`.
    fn eigh(&self, x: &Array, uplo: Uplo) -> Result<Eigh> {
        self.call(OpKind::Eigh).arg(x).arg(uplo).run()?.try_into()
    }

    /// Eigenvalues of a symmetric matrix, ascending
    fn eigvalsh<T: Operand>(&self, x: &T, uplo: Uplo) -> Result<T> {
        finish(
            OpKind::Eigvalsh,
            self.call(OpKind::Eigvalsh).arg(x.to_value()).arg(uplo),
        )
    }

    /// Inner product over the last axes; a 0-d operand scales the other
    fn inner<T: Operand>(&self, x1: &T, x2: &T) -> Result<T> {
        finish(
            OpKind::Inner,
            self.call(OpKind::Inner).arg(x1.to_value()).arg(x2.to_value()),
        )
    }

    /// Matrix inverse
    ///
    /// # Errors
    ///
    /// `BackendKernel` wrapping a singular-matrix failure when a pivot of
    /// the LU factorization falls below `n * eps * max|a|`.
    fn inv<T: Operand>(&self, x: &T) -> Result<T> {
        finish(OpKind::Inv, self.call(OpKind::Inv).arg(x.to_value()))
    }

    /// Matrix product with array-API 1-D and batch broadcasting rules
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let a = reg.array(&[2.0f64, 0.0, 3.0], &[3])?;
    /// let b = reg.array(&[4.0f64, 1.0, 8.0], &[3])?;
    /// let dot = reg.matmul(&a, &b)?; // 32.0, 0-d
    /// ```
    fn matmul<T: Operand>(&self, x1: &T, x2: &T) -> Result<T> {
        finish(
            OpKind::Matmul,
            self.call(OpKind::Matmul).arg(x1.to_value()).arg(x2.to_value()),
        )
    }

    /// Matrix norm over the last two axes
    fn matrix_norm<T: Operand>(&self, x: &T, ord: NormOrd, keepdims: bool) -> Result<T> {
        finish(
            OpKind::MatrixNorm,
            self.call(OpKind::MatrixNorm)
                .arg(x.to_value())
                .kwarg("ord", ord)
                .kwarg("keepdims", keepdims),
        )
    }

    /// Integer matrix power; negative powers invert first
    fn matrix_power<T: Operand>(&self, x: &T, n: i64) -> Result<T> {
        finish(
            OpKind::MatrixPower,
            self.call(OpKind::MatrixPower).arg(x.to_value()).arg(n),
        )
    }

    /// Numerical rank: singular values above `max(atol, rtol * s_max)`
    ///
    /// Without tolerances, `rtol` defaults to `eps * max(m, n)`. The result
    /// has the default integer dtype.
    fn matrix_rank<T: Operand>(&self, x: &T, atol: Option<f64>, rtol: Option<f64>) -> Result<T> {
        finish(
            OpKind::MatrixRank,
            self.call(OpKind::MatrixRank)
                .arg(x.to_value())
                .kwarg("atol", atol)
                .kwarg("rtol", rtol),
        )
    }

    /// Swap the last two axes
    fn matrix_transpose<T: Operand>(&self, x: &T) -> Result<T> {
        finish(
            OpKind::MatrixTranspose,
            self.call(OpKind::MatrixTranspose).arg(x.to_value()),
        )
    }

    /// Outer product of two vectors
    fn outer<T: Operand>(&self, x1: &T, x2: &T) -> Result<T> {
        finish(
            OpKind::Outer,
            self.call(OpKind::Outer).arg(x1.to_value()).arg(x2.to_value()),
        )
    }

    /// Moore-Penrose pseudo-inverse via SVD
    fn pinv<T: Operand>(&self, x: &T, rtol: Option<f64>) -> Result<T> {
        finish(
            OpKind::Pinv,
            self.call(OpKind::Pinv).arg(x.to_value()).kwarg("rtol", rtol),
        )
    }

    /// QR decomposition by Householder reflections
    fn qr(&self, x: &Array, mode: QrMode) -> Result<Qr> {
        self.call(OpKind::Qr).arg(x).arg(mode).run()?.try_into()
    }

    /// Sign and natural log of the absolute determinant
    fn slogdet(&self, x: &Array) -> Result<Slogdet> {
        self.call(OpKind::Slogdet).arg(x).run()?.try_into()
    }

    /// Solve `x1 @ y = x2` for `y`
    ///
    /// `x2` may be a vector `[n]` or a batch of matrices `[..., n, k]`.
    fn solve<T: Operand>(&self, x1: &T, x2: &T) -> Result<T> {
        finish(
            OpKind::Solve,
            self.call(OpKind::Solve).arg(x1.to_value()).arg(x2.to_value()),
        )
    }

    /// Singular value decomposition with `U` and `Vh`
    fn svd(&self, x: &Array, full_matrices: bool) -> Result<Svd> {
        self.call(OpKind::Svd)
            .arg(x)
            .kwarg("full_matrices", full_matrices)
            .run()?
            .try_into()
    }

    /// Singular values, descending
    fn svdvals<T: Operand>(&self, x: &T) -> Result<T> {
        finish(OpKind::Svdvals, self.call(OpKind::Svdvals).arg(x.to_value()))
    }

    /// Tensor contraction over the given axes
    fn tensordot<T: Operand>(&self, x1: &T, x2: &T, axes: TensordotAxes) -> Result<T> {
        finish(
            OpKind::Tensordot,
            self.call(OpKind::Tensordot)
                .arg(x1.to_value())
                .arg(x2.to_value())
                .arg(axes),
        )
    }

    /// Sum along a diagonal of the leading two axes
    fn trace<T: Operand>(&self, x: &T, offset: i64) -> Result<T> {
        finish(
            OpKind::Trace,
            self.call(OpKind::Trace).arg(x.to_value()).kwarg("offset", offset),
        )
    }

    /// Dot product along `axis`, broadcasting the other axes
    fn vecdot<T: Operand>(&self, x1: &T, x2: &T, axis: i64) -> Result<T> {
        finish(
            OpKind::Vecdot,
            self.call(OpKind::Vecdot)
                .arg(x1.to_value())
                .arg(x2.to_value())
                .arg(axis),
        )
    }

    /// Vector norm over `axis`, or over every element when `axis` is `None`
    fn vector_norm<T: Operand>(&self, x: &T, axis: Option<&[i64]>, keepdims: bool, ord: NormOrd) -> Result<T> {
        finish(
            OpKind::VectorNorm,
            self.call(OpKind::VectorNorm)
                .arg(x.to_value())
                .arg(axis)
                .arg(keepdims)
                .arg(ord),
        )
    }

    /// Skew-symmetric cross-product matrices `[..., 3, 3]` of 3-vectors
    fn vector_to_skew_symmetric_matrix<T: Operand>(&self, vector: &T) -> Result<T> {
        finish(
            OpKind::VectorToSkewSymmetricMatrix,
            self.call(OpKind::VectorToSkewSymmetricMatrix).arg(vector.to_value()),
        )
    }

    /// Vandermonde matrix with `n` columns (default: length of `x`)
    fn vander<T: Operand>(&self, x: &T, n: Option<usize>, increasing: bool) -> Result<T> {
        finish(
            OpKind::Vander,
            self.call(OpKind::Vander)
                .arg(x.to_value())
                .arg(n)
                .arg(increasing),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{BackendId, Registry};

    fn cpu() -> Registry {
        let reg = Registry::new();
        reg.set_backend(BackendId::Cpu).unwrap();
        reg
    }

    #[test]
    fn test_qr_reconstructs() {
        let reg = cpu();
        let x = reg.array(&[3.0f64, 1.0, 4.0, 2.0], &[2, 2]).unwrap();
        let Qr { q, r } = reg.qr(&x, QrMode::Reduced).unwrap();
        let back = reg.matmul(&q, &r).unwrap();
        for (got, want) in back.to_vec_f64().iter().zip([3.0, 1.0, 4.0, 2.0]) {
            assert!((got - want).abs() < 1e-10);
        }
    }

    #[test]
    fn test_svd_without_vectors() {
        let reg = cpu();
        let x = reg.array(&[3.0f64, 0.0, 0.0, -5.0], &[2, 2]).unwrap();
        let svd: Svd = reg
            .call(OpKind::Svd)
            .arg(&x)
            .kwarg("compute_uv", false)
            .run()
            .unwrap()
            .try_into()
            .unwrap();
        assert!(svd.u.is_none() && svd.vh.is_none());
        let s = svd.s.to_vec_f64();
        assert!((s[0] - 5.0).abs() < 1e-12 && (s[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_matrix_rank_dtype() {
        let reg = cpu();
        let x = reg.array(&[1.0f32, 2.0, 2.0, 4.0], &[2, 2]).unwrap();
        let rank = reg.matrix_rank(&x, None, None).unwrap();
        assert_eq!(rank.dtype(), crate::dtype::DType::I64);
        assert_eq!(rank.item(), Some(1.0));
    }
}
