//! Conversion between unified arrays and backend-native tensors
//!
//! Both directions recurse through sequences, maps, records and containers,
//! keeping their shape and key order. Scalars and options pass through.

use crate::error::{Error, Result};
use crate::runtime::BackendId;
use crate::tensor::Array;
use crate::value::{Container, Record, Value};

/// Convert unified arrays in `value` into natives of `backend`.
///
/// Natives already owned by `backend` pass through, so the conversion is
/// idempotent.
///
/// # Errors
///
/// - [`Error::StaleArray`] for a unified array created under another backend
/// - [`Error::UnsupportedNativeType`] for a native tensor of another backend
pub fn to_native(value: &Value, backend: BackendId) -> Result<Value> {
    Ok(match value {
        Value::Array(a) => {
            let native = a.native();
            if native.backend() != backend {
                return Err(Error::StaleArray {
                    array: native.backend(),
                    active: backend,
                });
            }
            Value::Native(native)
        }
        Value::Native(n) => {
            if n.backend() != backend {
                return Err(Error::UnsupportedNativeType {
                    kind: format!("{} tensor", n.backend()),
                    backend,
                });
            }
            Value::Native(n.clone())
        }
        Value::Seq(items) => Value::Seq(
            items
                .iter()
                .map(|v| to_native(v, backend))
                .collect::<Result<_>>()?,
        ),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), to_native(v, backend)?)))
                .collect::<Result<_>>()?,
        ),
        Value::Record(r) => Value::Record(Record::new(
            r.name,
            r.fields
                .iter()
                .map(|(name, v)| Ok((*name, to_native(v, backend)?)))
                .collect::<Result<_>>()?,
        )),
        Value::Container(c) => Value::Container(
            c.iter()
                .map(|(k, v)| Ok((k.to_string(), to_native(v, backend)?)))
                .collect::<Result<Container>>()?,
        ),
        scalar => scalar.clone(),
    })
}

/// Wrap every native tensor in `value` in a fresh unified handle.
///
/// Unified arrays are returned unchanged (same handle).
pub fn to_unified(value: Value) -> Value {
    match value {
        Value::Native(n) => Value::Array(Array::from_native(n)),
        Value::Seq(items) => Value::Seq(items.into_iter().map(to_unified).collect()),
        Value::Map(map) => Value::Map(map.into_iter().map(|(k, v)| (k, to_unified(v))).collect()),
        Value::Record(r) => Value::Record(Record::new(
            r.name,
            r.fields
                .into_iter()
                .map(|(name, v)| (name, to_unified(v)))
                .collect(),
        )),
        Value::Container(c) => {
            Value::Container(c.into_iter().map(|(k, v)| (k, to_unified(v))).collect())
        }
        other => other,
    }
}
