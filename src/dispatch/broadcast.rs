//! Broadcasting operations over nested containers
//!
//! When any argument is a [`Container`], the first such argument is primary:
//! the leaf function runs once per primary key with every container argument
//! narrowed to that key and non-container arguments passed as they are. The
//! results are collected into a container with the primary's keys in order.
//! Nested containers recurse, re-selecting the primary at each level.

use crate::error::{Error, Result};
use crate::value::{Container, Value};

/// How keys of secondary containers are matched against the primary
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Every container must have exactly the primary's keys
    #[default]
    Strict,
    /// Secondaries must have the primary's keys; extra keys are ignored
    PrimaryKeys,
}

/// Run `leaf` over `args`, broadcasting over any containers among them.
///
/// A container `out` is narrowed key for key like the arguments. Key errors
/// report argument positions; position `args.len()` denotes `out`.
pub fn broadcast<F>(args: &[Value], out: Option<&Value>, policy: KeyPolicy, leaf: &mut F) -> Result<Value>
where
    F: FnMut(&[Value], Option<&Value>) -> Result<Value>,
{
    walk(args, out, policy, "", leaf)
}

fn walk<F>(args: &[Value], out: Option<&Value>, policy: KeyPolicy, path: &str, leaf: &mut F) -> Result<Value>
where
    F: FnMut(&[Value], Option<&Value>) -> Result<Value>,
{
    let Some(primary) = args.iter().find_map(Value::as_container) else {
        return leaf(args, out);
    };

    // Extra keys in a secondary are missing from the primary
    if policy == KeyPolicy::Strict {
        let containers = args
            .iter()
            .filter_map(Value::as_container)
            .chain(out.and_then(Value::as_container));
        for container in containers {
            if let Some(extra) = container.keys().find(|k| !primary.contains_key(k)) {
                return Err(Error::KeyMismatch {
                    key: join(path, extra),
                    arg: primary_index(args),
                });
            }
        }
    }

    let mut result = Container::new();
    for key in primary.keys() {
        let key_path = join(path, key);
        let narrowed = args
            .iter()
            .enumerate()
            .map(|(index, arg)| narrow(arg, key, &key_path, index))
            .collect::<Result<Vec<_>>>()?;
        let narrowed_out = out.map(|o| narrow(o, key, &key_path, args.len())).transpose()?;
        let value = walk(&narrowed, narrowed_out.as_ref(), policy, &key_path, leaf)?;
        result.insert(key, value);
    }
    Ok(Value::Container(result))
}

fn narrow(value: &Value, key: &str, key_path: &str, index: usize) -> Result<Value> {
    match value {
        Value::Container(c) => c.get(key).cloned().ok_or_else(|| Error::KeyMismatch {
            key: key_path.to_string(),
            arg: index,
        }),
        other => Ok(other.clone()),
    }
}

fn primary_index(args: &[Value]) -> usize {
    args.iter().position(Value::is_container).unwrap_or(0)
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}/{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_leaf(args: &[Value], out: Option<&Value>) -> Result<Value> {
        let total: i64 = args.iter().filter_map(Value::as_int).sum();
        let offset = out.and_then(Value::as_int).unwrap_or(0);
        Ok(Value::Int(total + offset))
    }

    #[test]
    fn test_no_container_calls_leaf_once() {
        let mut calls = 0;
        let result = broadcast(&[Value::Int(1), Value::Int(2)], None, KeyPolicy::Strict, &mut |a, o| {
            calls += 1;
            sum_leaf(a, o)
        })
        .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(result.as_int(), Some(3));
    }

    #[test]
    fn test_per_key_with_uniform_args() {
        let x = Container::new()
            .with("b", 1i64)
            .with("a", Container::new().with("c", 2i64).with("d", 3i64));
        let args = [Value::Container(x), Value::Int(10)];
        let result = broadcast(&args, None, KeyPolicy::Strict, &mut sum_leaf).unwrap();
        let c = result.as_container().unwrap();
        assert_eq!(c.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(c.get("b").and_then(Value::as_int), Some(11));
        assert_eq!(c.get_path("a/d").and_then(Value::as_int), Some(13));
    }

    #[test]
    fn test_parallel_containers_and_out() {
        let x = Container::new().with("a", 1i64).with("b", 2i64);
        let y = Container::new().with("a", 10i64).with("b", 20i64);
        let out = Container::new().with("a", 100i64).with("b", 200i64);
        let args = [Value::Int(0), Value::Container(x), Value::Container(y)];
        let result = broadcast(&args, Some(&Value::Container(out)), KeyPolicy::Strict, &mut sum_leaf).unwrap();
        let c = result.as_container().unwrap();
        assert_eq!(c.get("a").and_then(Value::as_int), Some(111));
        assert_eq!(c.get("b").and_then(Value::as_int), Some(222));
    }

    #[test]
    fn test_missing_key() {
        let x = Container::new().with("a", 1i64).with("b", Container::new().with("c", 2i64));
        let y = Container::new().with("a", 1i64).with("b", Container::new());
        let args = [Value::Container(x), Value::Container(y)];
        let err = broadcast(&args, None, KeyPolicy::Strict, &mut sum_leaf).unwrap_err();
        assert!(matches!(err, Error::KeyMismatch { ref key, arg: 1 } if key == "b/c"));
    }

    #[test]
    fn test_extra_key_policy() {
        let x = Container::new().with("a", 1i64);
        let y = Container::new().with("a", 2i64).with("z", 3i64);
        let args = [Value::Container(x), Value::Container(y)];
        let err = broadcast(&args, None, KeyPolicy::Strict, &mut sum_leaf).unwrap_err();
        assert!(matches!(err, Error::KeyMismatch { ref key, arg: 0 } if key == "z"));

        let result = broadcast(&args, None, KeyPolicy::PrimaryKeys, &mut sum_leaf).unwrap();
        let c = result.as_container().unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c.get("a").and_then(Value::as_int), Some(3));
    }
}
