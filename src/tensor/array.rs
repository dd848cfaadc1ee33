//! Unified array handle

use super::{ArrayId, NativeArray, Shape};
use crate::dtype::{DType, Element};
use crate::runtime::BackendId;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::fmt;
use std::sync::Arc;

/// Backend-independent handle around exactly one native tensor
///
/// Cloning is cheap and yields the same handle: both clones observe writes
/// made through the `out` protocol, and [`Array::is_same`] holds between
/// them. Shape and dtype never change after creation.
#[derive(Clone)]
pub struct Array {
    id: ArrayId,
    inner: Arc<RwLock<NativeArray>>,
}

impl Array {
    /// Wrap a native tensor in a fresh handle
    pub fn from_native(native: NativeArray) -> Self {
        Self {
            id: ArrayId::next(),
            inner: Arc::new(RwLock::new(native)),
        }
    }

    /// Handle id, shared by clones
    pub fn id(&self) -> ArrayId {
        self.id
    }

    /// Whether two values are the same handle
    pub fn is_same(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Dimensions
    pub fn shape(&self) -> Shape {
        self.inner.read().shape().clone()
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.inner.read().shape().ndim()
    }

    /// Number of elements
    pub fn numel(&self) -> usize {
        self.inner.read().numel()
    }

    /// Element type
    pub fn dtype(&self) -> DType {
        self.inner.read().dtype()
    }

    /// Device tag of the underlying tensor
    pub fn device(&self) -> &'static str {
        self.inner.read().device()
    }

    /// Backend the underlying tensor belongs to
    pub fn backend(&self) -> BackendId {
        self.inner.read().backend()
    }

    /// Snapshot of the native tensor.
    ///
    /// Storage is shared until one side is written, so this is cheap.
    pub fn native(&self) -> NativeArray {
        self.inner.read().clone()
    }

    /// Exclusive access for the output-argument protocol
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, NativeArray> {
        self.inner.write()
    }

    /// Element values as f64, row-major
    pub fn to_vec_f64(&self) -> Vec<f64> {
        self.inner.read().to_f64_vec()
    }

    /// Element values converted to `T`, row-major
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        self.to_vec_f64().into_iter().map(T::from_f64).collect()
    }

    /// The single element of a one-element array
    pub fn item(&self) -> Option<f64> {
        let native = self.inner.read();
        if native.numel() == 1 {
            native.to_f64_vec().first().copied()
        } else {
            None
        }
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let native = self.inner.read();
        f.debug_struct("Array")
            .field("id", &self.id.get())
            .field("backend", &native.backend())
            .field("shape", native.shape())
            .field("dtype", &native.dtype())
            .finish()
    }
}
