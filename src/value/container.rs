//! Nested, insertion-ordered mapping of arrays

use super::Value;
use crate::tensor::Array;
use indexmap::IndexMap;

/// Insertion-ordered mapping from string keys to values
///
/// Leaves are arrays, plain per-leaf option values, or nested containers.
/// Operations broadcast over containers key by key (see
/// [`crate::dispatch::broadcast`]).
#[derive(Clone, Debug, Default)]
pub struct Container {
    entries: IndexMap<String, Value>,
}

impl Container {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous one under the key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Value under a top-level key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Array under a top-level key
    pub fn get_array(&self, key: &str) -> Option<&Array> {
        self.get(key).and_then(Value::as_array)
    }

    /// Value under a `/`-separated path, e.g. `"layer1/weight"`
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('/');
        let mut current = self.entries.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Container(c) => c.entries.get(part)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Whether a top-level key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Top-level keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Top-level entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every non-container leaf with its full `/`-separated path, depth first
    pub fn leaves(&self) -> Vec<(String, &Value)> {
        let mut out = Vec::new();
        self.collect_leaves("", &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Value)>) {
        for (key, value) in &self.entries {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}/{key}")
            };
            match value {
                Value::Container(inner) => inner.collect_leaves(&path, out),
                leaf => out.push((path, leaf)),
            }
        }
    }

    /// Number of top-level entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the container has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for Container {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Container {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
