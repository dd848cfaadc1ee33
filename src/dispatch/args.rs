//! Binding call arguments to an operation's declared parameters

use super::op::{OpSpec, Param, ParamDefault, ParamKind};
use crate::error::{Error, Result};
use crate::value::Value;

/// Bind positional and keyword arguments, filling defaults.
///
/// The result has one value per declared parameter, in declaration order.
pub(crate) fn bind(
    spec: &'static OpSpec,
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
) -> Result<Vec<Value>> {
    let params = spec.params;
    if positional.len() > params.len() {
        return Err(Error::invalid_argument(
            spec.name,
            "args",
            format!(
                "takes at most {} positional arguments, got {}",
                params.len(),
                positional.len()
            ),
        ));
    }

    let mut slots: Vec<Option<Value>> = positional.into_iter().map(Some).collect();
    slots.resize_with(params.len(), || None);

    for (name, value) in keywords {
        let index = spec
            .param_index(&name)
            .ok_or_else(|| Error::invalid_argument(spec.name, name.as_str(), "unexpected keyword argument"))?;
        if slots[index].is_some() {
            return Err(Error::invalid_argument(spec.name, name, "argument given more than once"));
        }
        slots[index] = Some(value);
    }

    params
        .iter()
        .zip(slots)
        .map(|(param, slot)| match slot {
            Some(value) => Ok(value),
            None => default_value(spec, param),
        })
        .collect()
}

fn default_value(spec: &OpSpec, param: &Param) -> Result<Value> {
    Ok(match param.default {
        ParamDefault::Required => {
            return Err(Error::invalid_argument(
                spec.name,
                param.name,
                "missing required argument",
            ));
        }
        ParamDefault::None => Value::None,
        ParamDefault::Bool(b) => Value::Bool(b),
        ParamDefault::Int(i) => Value::Int(i),
        ParamDefault::Float(f) => Value::Float(f),
        ParamDefault::Str(s) => Value::Str(s.to_string()),
        ParamDefault::Ints(list) => Value::Seq(list.iter().map(|&i| Value::Int(i)).collect()),
    })
}

fn is_array(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Native(_))
}

fn is_number(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Float(_))
}

fn is_int_list(value: &Value) -> bool {
    match value {
        Value::Int(_) => true,
        Value::Seq(items) => items.iter().all(|v| matches!(v, Value::Int(_))),
        _ => false,
    }
}

/// Whether `value` is acceptable for a parameter of `kind`
pub(crate) fn accepts(kind: ParamKind, value: &Value) -> bool {
    match kind {
        ParamKind::Tensor => is_array(value),
        ParamKind::TensorOrScalar => is_array(value) || is_number(value) || matches!(value, Value::Bool(_)),
        ParamKind::Operand => {
            is_array(value)
                || is_number(value)
                || value.is_none()
                || matches!(value, Value::Seq(items) if items.iter().all(is_number))
        }
        ParamKind::Int => matches!(value, Value::Int(_)),
        ParamKind::OptInt => matches!(value, Value::Int(_) | Value::None),
        ParamKind::Float => is_number(value),
        ParamKind::OptFloat => is_number(value) || value.is_none(),
        ParamKind::Bool => matches!(value, Value::Bool(_)),
        ParamKind::Str => matches!(value, Value::Str(_)),
        ParamKind::Ints => is_int_list(value),
        ParamKind::OptInts => is_int_list(value) || value.is_none(),
        ParamKind::Ord => is_number(value) || matches!(value, Value::Str(_)),
        ParamKind::Axes => {
            matches!(value, Value::Int(_))
                || matches!(value, Value::Seq(pair) if pair.len() == 2 && pair.iter().all(is_int_list))
        }
    }
}

/// Check every bound leaf value against its parameter kind
pub(crate) fn check_kinds(spec: &'static OpSpec, values: &[Value]) -> Result<()> {
    for (param, value) in spec.params.iter().zip(values) {
        if !accepts(param.kind, value) {
            return Err(Error::invalid_argument(
                spec.name,
                param.name,
                format!("expected {:?}, got {}", param.kind, value.kind_name()),
            ));
        }
    }
    Ok(())
}
