//! Array creation and conversion on the active backend

use crate::dispatch::normalize;
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::kernels::Dense;
use crate::runtime::{Backend, Registry};
use crate::tensor::{Array, NativeArray, Shape};
use crate::value::Value;
use std::sync::Arc;

impl Registry {
    fn creation_backend(&self, op: &'static str) -> Result<Arc<dyn Backend>> {
        self.active_backend().ok_or(Error::NoBackendSelected { op })
    }

    /// Array from typed values, with the values' dtype
    ///
    /// # Errors
    ///
    /// - [`Error::NoBackendSelected`] when no backend is active
    /// - [`Error::DataLength`] when `data` does not fill `shape`
    pub fn array<T: Element>(&self, data: &[T], shape: &[usize]) -> Result<Array> {
        let values: Vec<f64> = data.iter().map(|v| v.to_f64()).collect();
        self.array_with_dtype(&values, shape, T::DTYPE)
    }

    /// Array from f64 values rounded into `dtype`
    pub fn array_with_dtype(&self, values: &[f64], shape: &[usize], dtype: DType) -> Result<Array> {
        let backend = self.creation_backend("array")?;
        let shape = Shape::from(shape);
        if shape.checked_numel() != Some(values.len()) {
            return Err(Error::DataLength {
                len: values.len(),
                shape: shape.as_slice().to_vec(),
            });
        }
        let dense = Dense::new(shape, values.to_vec()).map_err(|e| normalize(e, backend.id(), "array"))?;
        Ok(Array::from_native(backend.from_dense(&dense, dtype)))
    }

    /// Zero-filled array
    ///
    /// # Errors
    ///
    /// - [`Error::NoBackendSelected`] when no backend is active
    /// - [`Error::InvalidArgument`] when the element count of `shape`
    ///   overflows
    pub fn zeros(&self, shape: &[usize], dtype: DType) -> Result<Array> {
        let backend = self.creation_backend("zeros")?;
        let shape = Shape::from(shape);
        if shape.checked_numel().is_none() {
            return Err(Error::invalid_argument(
                "zeros",
                "shape",
                format!("{shape:?} holds more elements than fit in memory"),
            ));
        }
        let dense = Dense::full(shape, 0.0);
        Ok(Array::from_native(backend.from_dense(&dense, dtype)))
    }

    /// Copy of `x` converted to `dtype`
    ///
    /// Integer targets truncate toward zero and saturate.
    pub fn astype(&self, x: &Array, dtype: DType) -> Result<Array> {
        let arg = Value::Array(x.clone());
        let backend = self.resolve_backend_for("astype", &[&arg])?;
        let native = backend
            .cast(&x.native(), dtype)
            .map_err(|e| normalize(e, backend.id(), "astype"))?;
        Ok(Array::from_native(native))
    }

    /// Adopt a native tensor of a registered backend
    pub fn wrap_native(&self, native: NativeArray) -> Result<Array> {
        self.backend(native.backend())?;
        Ok(Array::from_native(native))
    }
}
