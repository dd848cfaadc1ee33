//! Values the typed surface accepts and returns

use crate::error::{Error, Result};
use crate::tensor::Array;
use crate::value::{Container, Value};

/// Argument type of the typed operation traits
///
/// Calling an operation on an [`Array`] yields an `Array`; calling it on a
/// [`Container`] broadcasts key by key and yields a `Container`.
pub trait Operand: Sized {
    /// Argument form of this operand
    fn to_value(&self) -> Value;

    /// Recover the operand type from a dispatch result
    fn from_value(op: &'static str, value: Value) -> Result<Self>;
}

fn unexpected(op: &'static str, expected: &str, got: &Value) -> Error {
    Error::invalid_argument(
        op,
        "result",
        format!("expected {expected}, got {}", got.kind_name()),
    )
}

impl Operand for Array {
    fn to_value(&self) -> Value {
        Value::Array(self.clone())
    }

    fn from_value(op: &'static str, value: Value) -> Result<Self> {
        match value {
            Value::Array(a) => Ok(a),
            other => Err(unexpected(op, "an array", &other)),
        }
    }
}

impl Operand for Container {
    fn to_value(&self) -> Value {
        Value::Container(self.clone())
    }

    fn from_value(op: &'static str, value: Value) -> Result<Self> {
        match value {
            Value::Container(c) => Ok(c),
            other => Err(unexpected(op, "a container", &other)),
        }
    }
}

impl Operand for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(_op: &'static str, value: Value) -> Result<Self> {
        Ok(value)
    }
}
