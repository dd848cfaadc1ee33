//! Integration tests for the `out` buffer protocol
//!
//! Tests verify:
//! - Writing into `out` matches the fresh result on every backend
//! - The caller's own handle comes back, native or emulated
//! - The buffer keeps its dtype and shape
//! - Bad buffers fail without touching the buffer

mod common;

use common::{assert_allclose_f64, cpu_registry, each_backend};
use polyarr::dispatch::OutPath;
use polyarr::prelude::*;

#[test]
fn test_out_matches_fresh_result() {
    for reg in each_backend() {
        let a = reg.array(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let b = reg.array(&[1.0f64, 0.0, 0.5, 2.0, -1.0, 1.0], &[3, 2]).unwrap();
        let fresh = reg.matmul(&a, &b).unwrap();

        let buffer = reg.zeros(&[2, 2], DType::F64).unwrap();
        let written = reg.op(OpKind::Matmul).arg(&a).arg(&b).out(&buffer).run().unwrap();
        let written = written.as_array().unwrap();

        assert!(written.is_same(&buffer), "{:?}: handle replaced", reg.active_id());
        assert_allclose_f64(&buffer.to_vec_f64(), &fresh.to_vec_f64(), 0.0, 1e-12, "matmul out");
    }
}

#[test]
fn test_out_paths_per_backend() {
    let reg = Registry::new();
    let cpu = reg.backend(BackendId::Cpu).unwrap();
    assert_eq!(OutPath::for_backend(&*cpu, OpKind::Matmul), OutPath::Native);
    assert_eq!(OutPath::for_backend(&*cpu, OpKind::Vander), OutPath::Emulated);

    #[cfg(feature = "columnar")]
    {
        let columnar = reg.backend(BackendId::Columnar).unwrap();
        assert_eq!(OutPath::for_backend(&*columnar, OpKind::Matmul), OutPath::Emulated);
    }
}

#[test]
fn test_binary_into_returns_buffer() {
    for reg in each_backend() {
        let a = reg.array(&[1.0f32, 2.0, 3.0], &[3]).unwrap();
        let buffer = reg.zeros(&[2, 3], DType::F32).unwrap();
        let result = reg.add_into(&a, 10.0, &buffer).unwrap();
        assert!(result.is_same(&buffer));
        assert_eq!(buffer.shape().to_vec(), vec![2, 3]);
        assert_eq!(buffer.to_vec_f64(), vec![11.0, 12.0, 13.0, 11.0, 12.0, 13.0]);
    }
}

#[test]
fn test_out_keeps_buffer_dtype() {
    for reg in each_backend() {
        let a = reg.array(&[1.6f64, 2.2, -3.7], &[3]).unwrap();
        let buffer = reg.zeros(&[3], DType::I32).unwrap();
        reg.multiply_into(&a, 1.0, &buffer).unwrap();
        assert_eq!(buffer.dtype(), DType::I32);
        assert_eq!(buffer.to_vec::<i32>(), vec![1, 2, -3]);
    }
}

#[test]
fn test_out_shape_mismatch_leaves_buffer() {
    for reg in each_backend() {
        let a = reg.array(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let buffer = reg.zeros(&[3], DType::F64).unwrap();
        let err = reg.op(OpKind::Matmul).arg(&a).arg(&a).out(&buffer).run().unwrap_err();
        assert!(
            matches!(err, Error::OutputShapeMismatch { ref expected, ref got } if expected == &[2, 2] && got == &[3]),
            "{err}"
        );
        assert_eq!(buffer.to_vec_f64(), vec![0.0; 3]);
    }
}

#[test]
fn test_out_rejected_where_unsupported() {
    let reg = cpu_registry();
    let a = reg.array(&[2.0f64, 0.0, 0.0, 3.0], &[2, 2]).unwrap();
    let buffer = reg.zeros(&[2, 2], DType::F64).unwrap();

    let err = reg.op(OpKind::Qr).arg(&a).out(&buffer).run().unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { op: "qr", ref arg, .. } if arg == "out"));

    let err = reg.op(OpKind::Det).arg(&a).out(3.0).run().unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { op: "det", ref arg, .. } if arg == "out"));
}

#[cfg(feature = "columnar")]
#[test]
fn test_out_from_inactive_backend_is_stale() {
    let cpu = cpu_registry();
    let buffer = cpu.zeros(&[2], DType::F64).unwrap();

    let reg = common::columnar_registry();
    let err = reg.op(OpKind::Add).arg(1.0).arg(2.0).out(&buffer).run().unwrap_err();
    assert!(matches!(
        err,
        Error::StaleArray {
            array: BackendId::Cpu,
            active: BackendId::Columnar
        }
    ));
}
