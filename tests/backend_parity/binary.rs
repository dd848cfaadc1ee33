use crate::helpers::{assert_parity_f32, assert_parity_f64, on_both};
use polyarr::prelude::*;

#[test]
fn test_add_broadcast_parity() {
    let (cpu, col) = on_both("add", |reg| {
        let a = reg.array(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])?;
        let b = reg.array(&[0.5f32, -0.5, 0.25], &[3])?;
        reg.add(&a, &b)
    });
    assert_parity_f32(&cpu, &col, "add");
}

#[test]
fn test_mixed_dtype_parity() {
    let (cpu, col) = on_both("multiply", |reg| {
        let a = reg.array(&[1i32, -2, 3, 4], &[2, 2])?;
        let b = reg.array(&[0.1f64, 0.2], &[2, 1])?;
        reg.multiply(&a, &b)
    });
    assert_parity_f64(&cpu, &col, "multiply");

    let (cpu, col) = on_both("divide", |reg| {
        let a = reg.array(&[7i64, 9, -3], &[3])?;
        reg.divide(&a, 2i64)
    });
    assert_parity_f32(&cpu, &col, "divide");
    assert_eq!(cpu, vec![3.5, 4.5, -1.5]);
}

#[test]
fn test_subtract_into_parity() {
    let (cpu, col) = on_both("subtract_into", |reg| {
        let a = reg.array(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2])?;
        let out = reg.zeros(&[2, 2], DType::I16)?;
        reg.subtract_into(&a, 0.5, &out)
    });
    assert_eq!(cpu, col);
}
