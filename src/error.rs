//! Error types for polyarr

use crate::dtype::DType;
use crate::kernels::KernelError;
use crate::runtime::BackendId;
use thiserror::Error;

/// Result type alias using polyarr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
///
/// Lets callers decide whether a failure can be fixed by changing the
/// configuration, by changing the arguments, or not at all on this backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Registry or environment misconfiguration
    Configuration,
    /// Arguments violate an operation's contract
    Contract,
    /// The backend kernel itself failed
    Backend,
}

/// Errors that can occur while dispatching operations
#[derive(Error, Debug)]
pub enum Error {
    /// An operation ran before any backend was selected
    #[error("No backend selected: cannot dispatch '{op}'")]
    NoBackendSelected {
        /// The operation being dispatched
        op: &'static str,
    },

    /// Arguments of one call originate from different backends
    #[error("Ambiguous backend: arguments come from both '{first}' and '{second}'")]
    AmbiguousBackend {
        /// First backend seen
        first: BackendId,
        /// Conflicting backend
        second: BackendId,
    },

    /// A unified array outlived the backend it was created under
    #[error("Stale array: created under '{array}' but '{active}' is active")]
    StaleArray {
        /// Backend that produced the array
        array: BackendId,
        /// Currently active backend
        active: BackendId,
    },

    /// The requested backend is not registered
    #[error("Unknown backend '{0}'")]
    UnknownBackend(String),

    /// Dtype listed as unsupported for this operation on this backend version
    #[error("Unsupported dtype {dtype} for '{op}' on {backend} {version}")]
    UnsupportedDType {
        /// The rejected dtype
        dtype: DType,
        /// The operation name
        op: &'static str,
        /// Backend that rejected it
        backend: BackendId,
        /// Backend version the rule matched
        version: String,
    },

    /// No promotion rule exists for a dtype pair
    #[error("No promotion rule for {lhs} and {rhs}")]
    UnsupportedPromotion {
        /// Left-hand side dtype
        lhs: DType,
        /// Right-hand side dtype
        rhs: DType,
    },

    /// Shapes cannot be broadcast together
    #[error("Cannot broadcast shapes {lhs:?} and {rhs:?}")]
    ShapeMismatch {
        /// Left-hand side shape
        lhs: Vec<usize>,
        /// Right-hand side shape
        rhs: Vec<usize>,
    },

    /// The `out` buffer cannot hold the result
    #[error("Output buffer of shape {got:?} cannot hold a result of shape {expected:?}")]
    OutputShapeMismatch {
        /// Result shape
        expected: Vec<usize>,
        /// Buffer shape
        got: Vec<usize>,
    },

    /// A value reached the adapter that the target backend cannot own
    #[error("Value of kind '{kind}' cannot be converted for backend '{backend}'")]
    UnsupportedNativeType {
        /// Description of the offending value
        kind: String,
        /// Target backend
        backend: BackendId,
    },

    /// Container keys misaligned in a broadcast
    #[error("Container key '{key}' missing from argument {arg}")]
    KeyMismatch {
        /// Key path, `/`-separated
        key: String,
        /// Index of the argument lacking (or adding) the key
        arg: usize,
    },

    /// Normalized failure raised by a backend kernel
    #[error("{backend} kernel '{op}' failed: {source}")]
    BackendKernel {
        /// Backend that ran the kernel
        backend: BackendId,
        /// The operation name
        op: &'static str,
        /// Original kernel failure
        #[source]
        source: KernelError,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}' for '{op}': {reason}")]
    InvalidArgument {
        /// The operation name
        op: &'static str,
        /// The argument name
        arg: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Invalid axis index
    #[error("Invalid axis {axis} for array with {ndim} dimensions")]
    InvalidAxis {
        /// The invalid axis
        axis: isize,
        /// Number of dimensions
        ndim: usize,
    },

    /// Element count does not match the requested shape
    #[error("Data length {len} does not match shape {shape:?}")]
    DataLength {
        /// Number of elements supplied
        len: usize,
        /// Requested shape
        shape: Vec<usize>,
    },

    /// Backend has no kernel for the operation
    #[error("Operation '{op}' is not implemented by backend '{backend}'")]
    NotImplemented {
        /// The operation name
        op: &'static str,
        /// Backend lacking the kernel
        backend: BackendId,
    },

    /// Rejected configuration value
    #[error("Invalid configuration '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: &'static str,
        /// Reason for rejection
        reason: String,
    },
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(lhs: &[usize], rhs: &[usize]) -> Self {
        Self::ShapeMismatch {
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
    }

    /// Create an output shape mismatch error
    pub fn output_shape(expected: &[usize], got: &[usize]) -> Self {
        Self::OutputShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(
        op: &'static str,
        arg: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            op,
            arg: arg.into(),
            reason: reason.into(),
        }
    }

    /// Which broad class of failure this is
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoBackendSelected { .. }
            | Self::AmbiguousBackend { .. }
            | Self::StaleArray { .. }
            | Self::UnknownBackend(_)
            | Self::InvalidConfig { .. } => ErrorCategory::Configuration,
            Self::BackendKernel { .. } | Self::NotImplemented { .. } => ErrorCategory::Backend,
            Self::UnsupportedDType { .. }
            | Self::UnsupportedPromotion { .. }
            | Self::ShapeMismatch { .. }
            | Self::OutputShapeMismatch { .. }
            | Self::UnsupportedNativeType { .. }
            | Self::KeyMismatch { .. }
            | Self::InvalidArgument { .. }
            | Self::InvalidAxis { .. }
            | Self::DataLength { .. } => ErrorCategory::Contract,
        }
    }
}
