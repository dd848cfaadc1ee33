//! Integration tests for the linear-algebra surface
//!
//! Tests verify:
//! - Reference values for products, traces and norms
//! - Decompositions reconstruct their input
//! - Solvers agree with the inverse
//! - Kernel failures and rejected dtypes surface as typed errors

mod common;

use common::{assert_allclose_f64, cpu_registry, each_backend, matmul_ref, random_matrix, random_spd, rng, transpose_ref};
use polyarr::ops::{Eigh, Svd};
use polyarr::prelude::*;

#[test]
fn test_reference_values() {
    for reg in each_backend() {
        let a = reg.array(&[2.0f64, 0.0, 3.0], &[3]).unwrap();
        let b = reg.array(&[4.0f64, 1.0, 8.0], &[3]).unwrap();
        let dot = reg.matmul(&a, &b).unwrap();
        assert_eq!(dot.ndim(), 0);
        assert_eq!(dot.item(), Some(32.0));

        let m = reg.array(&[2.0f64, 0.0, 3.0, 3.0, 5.0, 6.0], &[2, 3]).unwrap();
        assert_eq!(reg.trace(&m, 0).unwrap().item(), Some(7.0));
        assert_eq!(reg.trace(&m, 1).unwrap().item(), Some(6.0));

        let v = reg.array(&[3.0f64, 4.0], &[2]).unwrap();
        assert_eq!(reg.vector_norm(&v, None, false, NormOrd::P(2.0)).unwrap().item(), Some(5.0));
        assert_eq!(reg.vector_norm(&v, None, false, NormOrd::Inf).unwrap().item(), Some(4.0));
    }
}

#[test]
fn test_vecdot_dtype_guard() {
    let reg = cpu_registry();
    let a = reg.array(&[2.0f64, 0.0, 3.0], &[3]).unwrap();
    let b = reg.array(&[4.0f64, 1.0, 8.0], &[3]).unwrap();
    assert_eq!(reg.vecdot(&a, &b, -1).unwrap().item(), Some(32.0));

    #[cfg(feature = "columnar")]
    {
        let reg = common::columnar_registry();
        let a = reg.array(&[2.0f64, 0.0, 3.0], &[3]).unwrap();
        let b = reg.array(&[4.0f64, 1.0, 8.0], &[3]).unwrap();
        assert!(matches!(
            reg.vecdot(&a, &b, -1),
            Err(Error::UnsupportedDType { dtype: DType::F64, op: "vecdot", backend: BackendId::Columnar, ref version })
                if version == "2.9.1"
        ));

        let a = reg.array(&[2i64, 0, 3], &[3]).unwrap();
        let b = reg.array(&[4i64, 1, 8], &[3]).unwrap();
        let dot = reg.vecdot(&a, &b, -1).unwrap();
        assert_eq!(dot.dtype(), DType::I64);
        assert_eq!(dot.item(), Some(32.0));
    }
}

#[test]
fn test_cholesky_reconstructs() {
    let mut rng = rng(7);
    for reg in each_backend() {
        let n = 4;
        let a = random_spd(&mut rng, n);
        let x = reg.array(&a, &[n, n]).unwrap();

        let l = reg.cholesky(&x, false).unwrap().to_vec_f64();
        let back = matmul_ref(&l, &transpose_ref(&l, n, n), n, n, n);
        assert_allclose_f64(&back, &a, 1e-10, 1e-10, "L L^T");

        let u = reg.cholesky(&x, true).unwrap().to_vec_f64();
        assert_allclose_f64(&u, &transpose_ref(&l, n, n), 0.0, 1e-12, "upper factor");
    }
}

#[test]
fn test_solve_agrees_with_inverse() {
    let mut rng = rng(11);
    let reg = cpu_registry();
    let n = 3;
    let a = random_spd(&mut rng, n);
    let b = random_matrix(&mut rng, n, 2);

    let x1 = reg.array(&a, &[n, n]).unwrap();
    let x2 = reg.array(&b, &[n, 2]).unwrap();
    let solved = reg.solve(&x1, &x2).unwrap();
    assert_eq!(solved.shape().to_vec(), vec![n, 2]);
    assert_allclose_f64(
        &matmul_ref(&a, &solved.to_vec_f64(), n, n, 2),
        &b,
        1e-10,
        1e-10,
        "A X = B",
    );

    let inverse = reg.inv(&x1).unwrap();
    let via_inverse = reg.matmul(&inverse, &x2).unwrap();
    assert_allclose_f64(&via_inverse.to_vec_f64(), &solved.to_vec_f64(), 1e-10, 1e-10, "inv(A) B");

    // a 1-D right-hand side keeps its rank
    let rhs = reg.array(&[1.0f64, 0.0, 0.0], &[3]).unwrap();
    assert_eq!(reg.solve(&x1, &rhs).unwrap().shape().to_vec(), vec![n]);
}

#[test]
fn test_svd_reconstructs() {
    let mut rng = rng(3);
    let reg = cpu_registry();
    let (m, n) = (3, 2);
    let a = random_matrix(&mut rng, m, n);
    let x = reg.array(&a, &[m, n]).unwrap();

    let Svd { u, s, vh } = reg.svd(&x, false).unwrap();
    let (u, vh) = (u.unwrap(), vh.unwrap());
    assert_eq!(u.shape().to_vec(), vec![m, n]);
    assert_eq!(vh.shape().to_vec(), vec![n, n]);

    let s = s.to_vec_f64();
    assert!(s[0] >= s[1] && s[1] >= 0.0, "{s:?}");
    let mut us = u.to_vec_f64();
    for row in us.chunks_mut(n) {
        for (value, sigma) in row.iter_mut().zip(&s) {
            *value *= sigma;
        }
    }
    let back = matmul_ref(&us, &vh.to_vec_f64(), m, n, n);
    assert_allclose_f64(&back, &a, 1e-10, 1e-10, "U S Vh");

    let vals = reg.svdvals(&x).unwrap();
    assert_allclose_f64(&vals.to_vec_f64(), &s, 1e-12, 1e-12, "svdvals");

    let full = reg.svd(&x, true).unwrap();
    assert_eq!(full.u.unwrap().shape().to_vec(), vec![m, m]);
}

#[test]
fn test_eigh_pairs() {
    let mut rng = rng(5);
    let reg = cpu_registry();
    let n = 3;
    let a = random_spd(&mut rng, n);
    let x = reg.array(&a, &[n, n]).unwrap();

    let Eigh {
        eigenvalues,
        eigenvectors,
    } = reg.eigh(&x, Uplo::Lower).unwrap();
    let w = eigenvalues.to_vec_f64();
    assert!(w.windows(2).all(|p| p[0] <= p[1]), "{w:?}");

    let v = eigenvectors.to_vec_f64();
    let av = matmul_ref(&a, &v, n, n, n);
    for j in 0..n {
        let column: Vec<f64> = (0..n).map(|i| av[i * n + j]).collect();
        let scaled: Vec<f64> = (0..n).map(|i| w[j] * v[i * n + j]).collect();
        assert_allclose_f64(&column, &scaled, 1e-9, 1e-9, "A v = w v");
    }

    let vals = reg.eigvalsh(&x, Uplo::Upper).unwrap();
    assert_allclose_f64(&vals.to_vec_f64(), &w, 1e-10, 1e-10, "eigvalsh");
}

#[test]
fn test_det_and_slogdet_agree() {
    let reg = cpu_registry();
    let x = reg.array(&[4.0f64, 7.0, 2.0, 6.0], &[2, 2]).unwrap();
    let det = reg.det(&x).unwrap().item().unwrap();
    assert!((det - 10.0).abs() < 1e-12);

    let sl = reg.slogdet(&x).unwrap();
    assert_eq!(sl.sign.item(), Some(1.0));
    assert!((sl.logabsdet.item().unwrap() - 10.0f64.ln()).abs() < 1e-12);
}

#[test]
fn test_structural_ops() {
    let reg = cpu_registry();
    let v = reg.array(&[1.0f64, 2.0], &[2]).unwrap();

    let d = reg.diag(&v, 1, 0.0, None, None).unwrap();
    assert_eq!(d.shape().to_vec(), vec![3, 3]);
    assert_eq!(d.to_vec_f64(), vec![0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0]);

    let o = reg.outer(&v, &v).unwrap();
    assert_eq!(o.to_vec_f64(), vec![1.0, 2.0, 2.0, 4.0]);

    let sq = reg.array(&[1.0f64, 1.0, 0.0, 1.0], &[2, 2]).unwrap();
    assert_eq!(reg.matrix_power(&sq, 3).unwrap().to_vec_f64(), vec![1.0, 3.0, 0.0, 1.0]);
    assert_eq!(reg.matrix_power(&sq, 0).unwrap().to_vec_f64(), vec![1.0, 0.0, 0.0, 1.0]);

    let e = reg.array(&[1.0f64, 0.0, 0.0], &[3]).unwrap();
    let f = reg.array(&[0.0f64, 1.0, 0.0], &[3]).unwrap();
    assert_eq!(reg.cross(&e, &f, -1).unwrap().to_vec_f64(), vec![0.0, 0.0, 1.0]);

    let skew = reg.vector_to_skew_symmetric_matrix(&reg.array(&[1.0f64, 2.0, 3.0], &[3]).unwrap()).unwrap();
    assert_eq!(skew.to_vec_f64(), vec![0.0, -3.0, 2.0, 3.0, 0.0, -1.0, -2.0, 1.0, 0.0]);

    let x = reg.array(&[1.0f64, 2.0, 3.0], &[3]).unwrap();
    let vander = reg.vander(&x, None, false).unwrap();
    assert_eq!(vander.to_vec_f64(), vec![1.0, 1.0, 1.0, 4.0, 2.0, 1.0, 9.0, 3.0, 1.0]);
}

#[test]
fn test_tensordot_axes() {
    let reg = cpu_registry();
    let a = reg.array(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    let b = reg.array(&[5.0f64, 6.0, 7.0, 8.0], &[2, 2]).unwrap();
    let full = reg.tensordot(&a, &b, TensordotAxes::Count(2)).unwrap();
    assert_eq!(full.item(), Some(70.0));

    let one = reg.tensordot(&a, &b, TensordotAxes::Count(1)).unwrap();
    assert_eq!(one.to_vec_f64(), reg.matmul(&a, &b).unwrap().to_vec_f64());

    let pairs = reg.tensordot(&a, &b, TensordotAxes::Pairs(vec![0], vec![0])).unwrap();
    assert_eq!(pairs.to_vec_f64(), vec![26.0, 30.0, 38.0, 44.0]);
}

#[test]
fn test_rank_and_pinv() {
    let reg = cpu_registry();
    let low = reg.array(&[1.0f64, 2.0, 2.0, 4.0], &[2, 2]).unwrap();
    let rank = reg.matrix_rank(&low, None, None).unwrap();
    assert_eq!(rank.dtype(), DType::I64);
    assert_eq!(rank.item(), Some(1.0));

    let x = reg.array(&[2.0f64, 0.0, 0.0, 4.0], &[2, 2]).unwrap();
    let p = reg.pinv(&x, None).unwrap();
    assert_allclose_f64(&p.to_vec_f64(), &[0.5, 0.0, 0.0, 0.25], 0.0, 1e-12, "pinv");

    let fro = reg.matrix_norm(&x, NormOrd::Frobenius, false).unwrap();
    assert!((fro.item().unwrap() - 20.0f64.sqrt()).abs() < 1e-12);
}

#[test]
fn test_kernel_failures_are_typed() {
    let reg = cpu_registry();
    let singular = reg.array(&[1.0f64, 2.0, 2.0, 4.0], &[2, 2]).unwrap();
    assert!(matches!(
        reg.inv(&singular),
        Err(Error::BackendKernel { op: "inv", backend: BackendId::Cpu, .. })
    ));

    let indefinite = reg.array(&[1.0f64, 2.0, 2.0, 1.0], &[2, 2]).unwrap();
    assert!(matches!(reg.cholesky(&indefinite, false), Err(Error::BackendKernel { op: "cholesky", .. })));

    let half = reg.array_with_dtype(&[1.0, 0.0, 0.0, 1.0], &[2, 2], DType::F16).unwrap();
    assert!(matches!(
        reg.det(&half),
        Err(Error::UnsupportedDType { dtype: DType::F16, op: "det", .. })
    ));
    // converting first is the supported path
    let widened = reg.astype(&half, DType::F32).unwrap();
    assert_eq!(reg.det(&widened).unwrap().item(), Some(1.0));
}
