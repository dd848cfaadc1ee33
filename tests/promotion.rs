//! Integration tests for dtype promotion and shape broadcasting
//!
//! Tests verify:
//! - Commutativity and associativity of both promotion rule sets
//! - Promotion applied to real operands through the dispatch pipeline
//! - Strict (array-API) registries rejecting cross-kind operands
//! - Broadcast shape rules

mod common;

use common::{assert_allclose_f64, cpu_registry};
use polyarr::dtype::PromotionTable;
use polyarr::error::ErrorCategory;
use polyarr::prelude::*;
use polyarr::tensor::{broadcast_all, broadcast_shapes};

const MODES: [PromotionMode; 2] = [PromotionMode::Extended, PromotionMode::ArrayApi];

#[test]
fn test_promotion_commutative() {
    for mode in MODES {
        let table = PromotionTable::for_mode(mode);
        for a in DType::ALL {
            for b in DType::ALL {
                let ab = table.promote(a, b).ok();
                let ba = table.promote(b, a).ok();
                assert_eq!(ab, ba, "{mode}: {a} vs {b}");
            }
        }
    }
}

#[test]
fn test_promotion_associative() {
    for mode in MODES {
        let table = PromotionTable::for_mode(mode);
        for a in DType::ALL {
            for b in DType::ALL {
                for c in DType::ALL {
                    let left = table.promote(a, b).and_then(|ab| table.promote(ab, c)).ok();
                    let right = table.promote(b, c).and_then(|bc| table.promote(a, bc)).ok();
                    assert_eq!(left, right, "{mode}: ({a}, {b}, {c})");
                }
            }
        }
    }
}

#[test]
fn test_extended_rules_are_total() {
    let table = PromotionTable::for_mode(PromotionMode::Extended);
    for a in DType::ALL {
        for b in DType::ALL {
            let joined = table.promote(a, b).unwrap();
            assert!(table.can_cast_safely(a, joined) && table.can_cast_safely(b, joined));
        }
    }
}

#[test]
fn test_mixed_operands_promote_in_pipeline() {
    let reg = cpu_registry();
    let a = reg.array(&[1u8, 2, 3], &[3]).unwrap();
    let b = reg.array(&[-1i8, -1, -1], &[3]).unwrap();
    let sum = reg.add(&a, &b).unwrap();
    assert_eq!(sum.dtype(), DType::I16);
    assert_eq!(sum.to_vec::<i16>(), vec![0, 1, 2]);

    let f = reg.array(&[0.5f32, 0.5, 0.5], &[3]).unwrap();
    let mixed = reg.multiply(&a, &f).unwrap();
    assert_eq!(mixed.dtype(), DType::F32);
    assert_allclose_f64(&mixed.to_vec_f64(), &[0.5, 1.0, 1.5], 0.0, 0.0, "u8 * f32");
}

#[test]
fn test_array_api_registry_rejects_cross_kind() {
    let config = RegistryConfig::new()
        .with_default_backend(BackendId::Cpu)
        .with_promotion(PromotionMode::ArrayApi);
    let reg = Registry::with_config(&config).unwrap();
    let a = reg.array(&[1i32, 2], &[2]).unwrap();
    let b = reg.array(&[1.0f32, 2.0], &[2]).unwrap();
    assert!(matches!(
        reg.add(&a, &b),
        Err(Error::UnsupportedPromotion { lhs: DType::I32, rhs: DType::F32 })
    ));

    let c = reg.array(&[3i64, 4], &[2]).unwrap();
    assert_eq!(reg.add(&a, &c).unwrap().dtype(), DType::I64);
}

#[test]
fn test_float_scalar_with_integer_array() {
    let reg = cpu_registry();
    let a = reg.array(&[1i32, 2], &[2]).unwrap();

    let sum = reg.op(OpKind::Add).arg(&a).arg(2.5).run().unwrap();
    let sum = sum.as_array().unwrap();
    assert_eq!(sum.dtype(), DType::F32);
    assert_eq!(sum.to_vec_f64(), vec![3.5, 4.5]);

    let product = reg.op(OpKind::Multiply).arg(0.5).arg(&a).run().unwrap();
    assert_eq!(product.as_array().unwrap().to_vec_f64(), vec![0.5, 1.0]);

    let shifted = reg.op(OpKind::Add).arg(&a).arg(3i64).run().unwrap();
    assert_eq!(shifted.as_array().unwrap().dtype(), DType::I32);
}

#[test]
fn test_divide_of_integers_is_floating() {
    let reg = cpu_registry();
    let a = reg.array(&[1i32, 3], &[2]).unwrap();
    let b = reg.array(&[2i32, 2], &[2]).unwrap();
    let q = reg.divide(&a, &b).unwrap();
    assert_eq!(q.dtype(), DType::F32);
    assert_eq!(q.to_vec_f64(), vec![0.5, 1.5]);
}

#[test]
fn test_broadcast_shapes() {
    assert!(matches!(
        broadcast_shapes(&[3, 4], &[5, 4]),
        Err(Error::ShapeMismatch { .. })
    ));
    assert_eq!(broadcast_shapes(&[3, 4], &[1, 4]).unwrap().as_slice(), &[3, 4]);
    assert_eq!(broadcast_shapes(&[4], &[2, 1]).unwrap().as_slice(), &[2, 4]);
    assert_eq!(broadcast_shapes(&[], &[2, 3]).unwrap().as_slice(), &[2, 3]);
    assert_eq!(
        broadcast_all(&[vec![1, 3], vec![2, 1], vec![3]]).unwrap().as_slice(),
        &[2, 3]
    );
}

#[test]
fn test_incompatible_shapes_are_contract_errors() {
    let reg = cpu_registry();
    let a = reg.zeros(&[3, 4], DType::F32).unwrap();
    let b = reg.zeros(&[5, 4], DType::F32).unwrap();
    let err = reg.add(&a, &b).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Contract);
    assert!(matches!(
        err,
        Error::ShapeMismatch { ref lhs, ref rhs } if *lhs == [3, 4] && *rhs == [5, 4]
    ));

    let x = reg.zeros(&[2, 3], DType::F64).unwrap();
    assert!(matches!(reg.matmul(&x, &x), Err(Error::ShapeMismatch { .. })));
}
