//! CPU backend
//!
//! The reference backend: row-major tensors stored as raw bytes in each
//! dtype's native width. Kernels read the bytes into f64, compute, and write
//! the result back rounded into the target dtype, so integer and half
//! precision tensors behave like their storage type.

mod backend;
mod tensor;

pub use backend::{CPU_VERSION, CpuBackend};
pub use tensor::CpuTensor;
