//! Columnar backend
//!
//! Stores every tensor as column-major f64 values rounded into the tensor's
//! dtype. It exists to exercise the parts of the dispatch core that differ
//! between engines: a different native layout, a different unsupported-dtype
//! table, and no native `out` support.

mod backend;
mod tensor;

pub use backend::{COLUMNAR_VERSION, ColumnarBackend};
pub use tensor::ColumnTensor;
