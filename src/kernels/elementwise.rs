//! Broadcasting binary arithmetic

use super::KernelError;
use super::dense::{Dense, broadcast_dims, broadcast_offsets};
use crate::dispatch::op::OpKind;

/// Apply one of the four arithmetic operations with broadcasting
pub fn binary(op: OpKind, x1: &Dense, x2: &Dense) -> Result<Dense, KernelError> {
    let f: fn(f64, f64) -> f64 = match op {
        OpKind::Add => |a, b| a + b,
        OpKind::Subtract => |a, b| a - b,
        OpKind::Multiply => |a, b| a * b,
        OpKind::Divide => |a, b| a / b,
        other => {
            return Err(KernelError::Invalid(format!(
                "'{other}' is not a binary arithmetic operation"
            )));
        }
    };

    // Fast path: identical shapes
    if x1.shape() == x2.shape() {
        let data = x1.data().iter().zip(x2.data()).map(|(&a, &b)| f(a, b)).collect();
        return Ok(Dense::from_parts(x1.shape().clone(), data));
    }

    let shape = broadcast_dims(x1.shape(), x2.shape())?;
    let lhs = broadcast_offsets(x1.shape(), &shape)?;
    let rhs = broadcast_offsets(x2.shape(), &shape)?;
    let data = lhs
        .into_iter()
        .zip(rhs)
        .map(|(i, j)| f(x1.data()[i], x2.data()[j]))
        .collect();
    Ok(Dense::from_parts(shape, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_add() {
        let a = Dense::new([2, 1], vec![1.0, 2.0]).unwrap();
        let b = Dense::new([3], vec![10.0, 20.0, 30.0]).unwrap();
        let r = binary(OpKind::Add, &a, &b).unwrap();
        assert_eq!(r.shape().as_slice(), &[2, 3]);
        assert_eq!(r.data(), &[11.0, 21.0, 31.0, 12.0, 22.0, 32.0]);
    }

    #[test]
    fn test_scalar_operand() {
        let a = Dense::new([3], vec![2.0, 4.0, 6.0]).unwrap();
        let r = binary(OpKind::Divide, &a, &Dense::scalar(2.0)).unwrap();
        assert_eq!(r.data(), &[1.0, 2.0, 3.0]);
        let r = binary(OpKind::Subtract, &Dense::scalar(1.0), &a).unwrap();
        assert_eq!(r.data(), &[-1.0, -3.0, -5.0]);
    }

    #[test]
    fn test_rejects_other_ops() {
        let a = Dense::scalar(1.0);
        assert!(binary(OpKind::Matmul, &a, &a).is_err());
        let b = Dense::new([2], vec![1.0, 2.0]).unwrap();
        let c = Dense::new([3], vec![1.0, 2.0, 3.0]).unwrap();
        assert!(binary(OpKind::Add, &b, &c).is_err());
    }
}
