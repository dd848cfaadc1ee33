//! Common test utilities
#![allow(dead_code)]

use polyarr::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Registry with the cpu backend active
pub fn cpu_registry() -> Registry {
    let reg = Registry::new();
    reg.set_backend(BackendId::Cpu).expect("cpu backend is always registered");
    reg
}

/// Registry with the columnar backend active
#[cfg(feature = "columnar")]
pub fn columnar_registry() -> Registry {
    let reg = Registry::new();
    reg.set_backend(BackendId::Columnar)
        .expect("columnar backend is registered with the feature");
    reg
}

/// One registry per available backend, each with that backend active
pub fn each_backend() -> Vec<Registry> {
    Registry::new()
        .available()
        .into_iter()
        .map(|id| {
            let reg = Registry::new();
            reg.set_backend(id).unwrap();
            reg
        })
        .collect()
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Seeded generator so failures reproduce
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Row-major matrix with entries in [-1, 1)
pub fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Vec<f64> {
    (0..rows * cols).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// Symmetric positive-definite matrix: `B^T B + n I`
pub fn random_spd(rng: &mut StdRng, n: usize) -> Vec<f64> {
    let b = random_matrix(rng, n, n);
    let mut a = matmul_ref(&transpose_ref(&b, n, n), &b, n, n, n);
    for i in 0..n {
        a[i * n + i] += n as f64;
    }
    a
}

/// Reference row-major matrix product
pub fn matmul_ref(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut c = vec![0.0; m * n];
    for i in 0..m {
        for p in 0..k {
            let aip = a[i * k + p];
            for j in 0..n {
                c[i * n + j] += aip * b[p * n + j];
            }
        }
    }
    c
}

/// Reference transpose of a `rows x cols` matrix
pub fn transpose_ref(a: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut t = vec![0.0; rows * cols];
    for i in 0..rows {
        for j in 0..cols {
            t[j * rows + i] = a[i * cols + j];
        }
    }
    t
}
