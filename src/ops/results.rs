//! Typed views of record results

use crate::error::{Error, Result};
use crate::tensor::Array;
use crate::value::{Record, Value};

fn field(record: &mut Record, name: &'static str) -> Result<Array> {
    let op = record.name;
    record
        .take(name)
        .and_then(Value::into_array)
        .ok_or_else(|| Error::invalid_argument(op, name, "missing array field in result"))
}

fn record(op: &'static str, value: Value) -> Result<Record> {
    value
        .into_record()
        .ok_or_else(|| Error::invalid_argument(op, "result", "expected a record"))
}

/// Eigendecomposition of a symmetric matrix: `A = V @ diag(w) @ V^T`
#[derive(Clone, Debug)]
pub struct Eigh {
    /// Eigenvalues `[..., n]` in ascending order
    pub eigenvalues: Array,
    /// Eigenvectors as columns `[..., n, n]`
    pub eigenvectors: Array,
}

impl TryFrom<Value> for Eigh {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let mut rec = record("eigh", value)?;
        Ok(Self {
            eigenvalues: field(&mut rec, "eigenvalues")?,
            eigenvectors: field(&mut rec, "eigenvectors")?,
        })
    }
}

/// QR decomposition: `A = Q @ R`
#[derive(Clone, Debug)]
pub struct Qr {
    /// Orthonormal columns
    pub q: Array,
    /// Upper triangular factor
    pub r: Array,
}

impl TryFrom<Value> for Qr {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let mut rec = record("qr", value)?;
        Ok(Self {
            q: field(&mut rec, "Q")?,
            r: field(&mut rec, "R")?,
        })
    }
}

/// Sign and log-magnitude of a determinant
#[derive(Clone, Debug)]
pub struct Slogdet {
    /// `-1`, `0` or `1`
    pub sign: Array,
    /// `ln |det|`; `-inf` for singular matrices
    pub logabsdet: Array,
}

impl TryFrom<Value> for Slogdet {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let mut rec = record("slogdet", value)?;
        Ok(Self {
            sign: field(&mut rec, "sign")?,
            logabsdet: field(&mut rec, "logabsdet")?,
        })
    }
}

/// Singular value decomposition: `A = U @ diag(S) @ Vh`
///
/// `u` and `vh` are `None` when computed with `compute_uv = false`.
#[derive(Clone, Debug)]
pub struct Svd {
    /// Left singular vectors
    pub u: Option<Array>,
    /// Singular values, descending
    pub s: Array,
    /// Right singular vectors, transposed
    pub vh: Option<Array>,
}

impl TryFrom<Value> for Svd {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let mut rec = record("svd", value)?;
        let s = field(&mut rec, "S")?;
        Ok(Self {
            u: rec.take("U").and_then(Value::into_array),
            s,
            vh: rec.take("Vh").and_then(Value::into_array),
        })
    }
}
