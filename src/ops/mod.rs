//! Unified operation surface
//!
//! Typed entry points over the dispatch core. Operations are provided
//! methods of traits implemented by [`Registry`](crate::runtime::Registry):
//!
//! ```text
//! Registry
//!   ├── implements LinalgOps         (matmul, solve, qr, svd, norms, ...)
//!   ├── implements NormalizationOps  (layer_norm)
//!   ├── implements BinaryOps         (add, subtract, multiply, divide)
//!   └── factories                    (array, zeros, astype, wrap_native)
//! ```
//!
//! Each method accepts any [`Operand`]: an [`Array`](crate::tensor::Array)
//! runs one kernel call, a [`Container`](crate::value::Container) runs one
//! per leaf and returns a container of results. Record results come back as
//! the typed [`Eigh`], [`Qr`], [`Slogdet`] and [`Svd`].

mod container;
mod factory;
mod operand;
mod options;
mod results;
pub mod traits;

pub use operand::Operand;
pub use options::{LayerNormOptions, NormOrd, QrMode, TensordotAxes, Uplo};
pub use results::{Eigh, Qr, Slogdet, Svd};
pub use traits::{BinaryOps, Dispatch, LinalgOps, NormalizationOps};
