//! Shared helpers for backend parity tests: assertion utilities and per-backend runs.

use crate::common::{columnar_registry, cpu_registry};
use polyarr::prelude::*;

pub fn assert_parity_f32(a: &[f64], b: &[f64], op: &str) {
    assert_parity(a, b, 1e-5, 1e-7, op);
}

pub fn assert_parity_f64(a: &[f64], b: &[f64], op: &str) {
    assert_parity(a, b, 1e-12, 1e-14, op);
}

fn assert_parity(a: &[f64], b: &[f64], rtol: f64, atol: f64, op: &str) {
    assert_eq!(
        a.len(),
        b.len(),
        "parity[{}]: length mismatch: {} vs {}",
        op,
        a.len(),
        b.len()
    );

    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();

        if diff > tol {
            panic!(
                "parity[{}] at index {}: {} vs {} (diff={}, tol={})",
                op, i, x, y, diff, tol
            );
        }
    }
}

/// Run `f` on the cpu and the columnar backend.
///
/// Checks both results agree on shape and dtype and returns their values.
pub fn on_both(op: &str, f: impl Fn(&Registry) -> Result<Array>) -> (Vec<f64>, Vec<f64>) {
    let cpu = f(&cpu_registry()).unwrap_or_else(|e| panic!("{op} on cpu: {e}"));
    let col = f(&columnar_registry()).unwrap_or_else(|e| panic!("{op} on columnar: {e}"));
    assert_eq!(cpu.backend(), BackendId::Cpu);
    assert_eq!(col.backend(), BackendId::Columnar);
    assert_eq!(cpu.shape(), col.shape(), "{op}: shape mismatch");
    assert_eq!(cpu.dtype(), col.dtype(), "{op}: dtype mismatch");
    (cpu.to_vec_f64(), col.to_vec_f64())
}
