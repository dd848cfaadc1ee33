use crate::common::{random_matrix, random_spd, rng};
use crate::helpers::{assert_parity_f32, assert_parity_f64, on_both};
use polyarr::ops::Qr;
use polyarr::prelude::*;

#[test]
fn test_matmul_parity() {
    let mut rng = rng(21);
    let a = random_matrix(&mut rng, 4, 3);
    let b = random_matrix(&mut rng, 3, 5);
    let (cpu, col) = on_both("matmul", |reg| {
        reg.matmul(&reg.array(&a, &[4, 3])?, &reg.array(&b, &[3, 5])?)
    });
    assert_parity_f64(&cpu, &col, "matmul");
}

#[test]
fn test_factorization_parity() {
    let mut rng = rng(22);
    let spd = random_spd(&mut rng, 4);

    let (cpu, col) = on_both("cholesky", |reg| reg.cholesky(&reg.array(&spd, &[4, 4])?, false));
    assert_parity_f64(&cpu, &col, "cholesky");

    let (cpu, col) = on_both("inv", |reg| reg.inv(&reg.array(&spd, &[4, 4])?));
    assert_parity_f64(&cpu, &col, "inv");

    let (cpu, col) = on_both("qr", |reg| {
        let Qr { r, .. } = reg.qr(&reg.array(&spd, &[4, 4])?, QrMode::Reduced)?;
        Ok(r)
    });
    assert_parity_f64(&cpu, &col, "qr");
}

#[test]
fn test_norm_parity() {
    let mut rng = rng(23);
    let x: Vec<f32> = random_matrix(&mut rng, 3, 4).into_iter().map(|v| v as f32).collect();

    let (cpu, col) = on_both("vector_norm", |reg| {
        reg.vector_norm(&reg.array(&x, &[3, 4])?, Some(&[1][..]), false, NormOrd::P(2.0))
    });
    assert_parity_f32(&cpu, &col, "vector_norm");

    let (cpu, col) = on_both("svdvals", |reg| reg.svdvals(&reg.array(&x, &[3, 4])?));
    assert_parity_f32(&cpu, &col, "svdvals");

    let (cpu, col) = on_both("layer_norm", |reg| {
        reg.layer_norm(
            &reg.array(&x, &[3, 4])?,
            &[-1],
            LayerNormOptions::new().new_std(2.0).bias(0.5),
        )
    });
    assert_parity_f32(&cpu, &col, "layer_norm");
}
