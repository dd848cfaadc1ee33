//! # polyarr
//!
//! **One array API over interchangeable numeric backends.**
//!
//! polyarr exposes a single set of tensor and linear-algebra operations
//! (`matmul`, `solve`, `qr`, `svd`, `vector_norm`, `layer_norm`, ...) and
//! dispatches each call to whichever backend is currently active. The same
//! call works on a single array or on a nested [`Container`](value::Container)
//! of arrays, key by key.
//!
//! ## What the dispatch core does
//!
//! - **Backend selection**: a [`Registry`](runtime::Registry) holds the
//!   available backends and a stack of active selections
//! - **Dtype promotion**: operands are promoted to a common dtype through a
//!   fixed lattice, with extended and strict array-API rule sets
//! - **Versioned dtype guards**: each backend declares which dtypes an
//!   operation rejects at which backend versions
//! - **Output buffers**: `out` works on every backend, natively or by an
//!   emulated copy, and always hands back the caller's handle
//! - **Container broadcasting**: nested mappings are walked key by key with
//!   strict key checking
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use polyarr::prelude::*;
//!
//! let reg = Registry::new();
//! reg.set_backend(BackendId::Cpu)?;
//!
//! let a = reg.array(&[4.0f64, 2.0, 2.0, 3.0], &[2, 2])?;
//! let l = reg.cholesky(&a, false)?;
//! let n = reg.vector_norm(&a, None, false, NormOrd::P(2.0))?;
//!
//! // The same call over a container of arrays
//! let params = Container::new().with("w", a.clone()).with("v", reg.zeros(&[2, 2], DType::F32)?);
//! let transposed = reg.matrix_transpose(&params)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `columnar` (default): column-major second backend
//! - `rayon` (default): parallel batched kernels

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod dispatch;
pub mod dtype;
pub mod error;
pub mod kernels;
pub mod ops;
pub mod runtime;
pub mod tensor;
pub mod value;

pub use runtime::registry;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dispatch::{KeyPolicy, OpKind};
    pub use crate::dtype::{DType, PromotionMode};
    pub use crate::error::{Error, Result};
    pub use crate::ops::{
        BinaryOps, Dispatch, LayerNormOptions, LinalgOps, NormOrd, NormalizationOps, QrMode, TensordotAxes,
        Uplo,
    };
    pub use crate::runtime::{BackendId, Registry, RegistryConfig};
    pub use crate::tensor::Array;
    pub use crate::value::{Container, Value};
}
