//! Dynamic values flowing through the dispatch pipeline
//!
//! Arguments and results of a dispatched call are [`Value`]s: arrays (unified
//! or native), plain scalars and options, sequences, string-keyed maps, named
//! records, and nested [`Container`]s.

mod container;

pub use container::Container;

use crate::tensor::{Array, NativeArray};
use indexmap::IndexMap;

/// Named tuple result, e.g. `qr -> (Q, R)`
#[derive(Clone, Debug)]
pub struct Record {
    /// Record type name (e.g. `"qr"`)
    pub name: &'static str,
    /// Fields in declaration order
    pub fields: Vec<(&'static str, Value)>,
}

impl Record {
    /// Create a record
    pub fn new(name: &'static str, fields: Vec<(&'static str, Value)>) -> Self {
        Self { name, fields }
    }

    /// Field by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, v)| v)
    }

    /// Field names in order
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    /// Remove and return a field by name
    pub fn take(&mut self, field: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(name, _)| *name == field)?;
        Some(self.fields.remove(pos).1)
    }
}

/// Argument or result of a dispatched operation
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent option
    #[default]
    None,
    /// Boolean scalar
    Bool(bool),
    /// Integer scalar
    Int(i64),
    /// Float scalar
    Float(f64),
    /// String option (e.g. `"fro"`, `"reduced"`)
    Str(String),
    /// Ordered sequence
    Seq(Vec<Value>),
    /// String-keyed mapping that is not broadcast over
    Map(IndexMap<String, Value>),
    /// Named tuple
    Record(Record),
    /// Unified array handle
    Array(Array),
    /// Raw backend tensor
    Native(NativeArray),
    /// Nested container, broadcast over key by key
    Container(Container),
}

impl Value {
    /// Short description of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Seq(_) => "sequence",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
            Self::Array(_) => "array",
            Self::Native(_) => "native",
            Self::Container(_) => "container",
        }
    }

    /// Whether this is [`Value::None`]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The unified array, if this is one
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The unified array, consuming the value
    pub fn into_array(self) -> Option<Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The container, if this is one
    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Self::Container(c) => Some(c),
            _ => None,
        }
    }

    /// The record, consuming the value
    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Integer payload (booleans are not integers here)
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric payload widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether any container appears at the top level of this value
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Container(_))
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Self::Array(a)
    }
}

impl From<&Array> for Value {
    fn from(a: &Array) -> Self {
        Self::Array(a.clone())
    }
}

impl From<NativeArray> for Value {
    fn from(n: NativeArray) -> Self {
        Self::Native(n)
    }
}

impl From<Container> for Value {
    fn from(c: Container) -> Self {
        Self::Container(c)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl From<&[i64]> for Value {
    fn from(v: &[i64]) -> Self {
        Self::Seq(v.iter().map(|&i| Self::Int(i)).collect())
    }
}

impl From<&[f64]> for Value {
    fn from(v: &[f64]) -> Self {
        Self::Seq(v.iter().map(|&f| Self::Float(f)).collect())
    }
}
