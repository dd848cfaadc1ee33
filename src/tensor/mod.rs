//! Array types
//!
//! This module provides the unified [`Array`] handle, the tagged
//! [`NativeArray`] it wraps, and the [`Shape`] type with its broadcasting
//! rules.

mod array;
mod id;
mod native;
mod shape;

pub use array::Array;
pub use id::ArrayId;
pub use native::NativeArray;
pub use shape::{Shape, broadcast_all, broadcast_shapes, normalize_axis};
