//! Declarative operation table
//!
//! Every dispatchable operation is described once by an [`OpSpec`]: its
//! parameter list with defaults, whether tensor operands are promoted to a
//! common dtype, whether it accepts an `out` buffer, and how its result dtype
//! follows from the operand dtype. The pipeline is assembled from these flags.

use crate::dtype::DType;
use std::fmt;
use std::str::FromStr;

/// Identifier of a dispatchable operation
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum OpKind {
    /// `cholesky`
    Cholesky,
    /// `cross`
    Cross,
    /// `det`
    Det,
    /// `diag`
    Diag,
    /// `diagonal`
    Diagonal,
    /// `eigh`
    Eigh,
    /// `eigvalsh`
    Eigvalsh,
    /// `inner`
    Inner,
    /// `inv`
    Inv,
    /// `matmul`
    Matmul,
    /// `matrix_norm`
    MatrixNorm,
    /// `matrix_power`
    MatrixPower,
    /// `matrix_rank`
    MatrixRank,
    /// `matrix_transpose`
    MatrixTranspose,
    /// `outer`
    Outer,
    /// `pinv`
    Pinv,
    /// `qr`
    Qr,
    /// `slogdet`
    Slogdet,
    /// `solve`
    Solve,
    /// `svd`
    Svd,
    /// `svdvals`
    Svdvals,
    /// `tensordot`
    Tensordot,
    /// `trace`
    Trace,
    /// `vecdot`
    Vecdot,
    /// `vector_norm`
    VectorNorm,
    /// `vector_to_skew_symmetric_matrix`
    VectorToSkewSymmetricMatrix,
    /// `vander`
    Vander,
    /// `layer_norm`
    LayerNorm,
    /// `add`
    Add,
    /// `subtract`
    Subtract,
    /// `multiply`
    Multiply,
    /// `divide`
    Divide,
}

/// How an argument is interpreted
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// An array
    Tensor,
    /// An array or a numeric scalar
    TensorOrScalar,
    /// An array, a numeric scalar, a sequence of numbers, or none
    Operand,
    /// An integer
    Int,
    /// An integer or none
    OptInt,
    /// A float (integers are accepted)
    Float,
    /// A float or none
    OptFloat,
    /// A boolean
    Bool,
    /// A string
    Str,
    /// One integer or a sequence of integers
    Ints,
    /// Like [`ParamKind::Ints`], or none
    OptInts,
    /// A norm order: a number or one of `"fro"`, `"nuc"`, `"inf"`, `"-inf"`
    Ord,
    /// Tensordot axes: an integer or a pair of integer sequences
    Axes,
}

impl ParamKind {
    /// Whether values of this kind may carry arrays
    pub fn holds_tensor(self) -> bool {
        matches!(self, Self::Tensor | Self::TensorOrScalar | Self::Operand)
    }
}

/// Default applied when an argument is omitted
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ParamDefault {
    /// Must be supplied
    Required,
    /// Defaults to none
    None,
    /// Boolean default
    Bool(bool),
    /// Integer default
    Int(i64),
    /// Float default
    Float(f64),
    /// String default
    Str(&'static str),
    /// Integer-list default
    Ints(&'static [i64]),
}

/// One declared parameter
#[derive(Copy, Clone, Debug)]
pub struct Param {
    /// Keyword name
    pub name: &'static str,
    /// Accepted values
    pub kind: ParamKind,
    /// Value used when omitted
    pub default: ParamDefault,
}

/// How the result dtype follows from the (promoted) operand dtype
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResultDType {
    /// Same dtype as the operand
    Same,
    /// Operand dtype when floating, otherwise the default float dtype
    Float,
    /// Like [`ResultDType::Float`] when the named integer argument is negative,
    /// otherwise [`ResultDType::Same`]
    FloatIfNegative(&'static str),
    /// Always the default integer dtype
    Index,
}

impl ResultDType {
    /// Resolve against an operand dtype
    pub fn resolve(self, operand: DType, negative_flag: bool) -> DType {
        let floating = if operand.is_float() {
            operand
        } else {
            DType::default_float()
        };
        match self {
            Self::Same => operand,
            Self::Float => floating,
            Self::FloatIfNegative(_) if negative_flag => floating,
            Self::FloatIfNegative(_) => operand,
            Self::Index => DType::default_int(),
        }
    }
}

/// Static description of one operation
#[derive(Debug)]
pub struct OpSpec {
    /// Operation identifier
    pub kind: OpKind,
    /// Public name
    pub name: &'static str,
    /// Parameters in positional order
    pub params: &'static [Param],
    /// Promote tensor operands to a common dtype before invoking
    pub promotes: bool,
    /// Accepts an `out` buffer
    pub out: bool,
    /// May be broadcast over containers
    pub nestable: bool,
    /// Result dtype rule
    pub result: ResultDType,
}

impl OpSpec {
    /// Position of a parameter by name
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    /// Whether the result is a record (named tuple)
    pub fn returns_record(&self) -> bool {
        matches!(
            self.kind,
            OpKind::Eigh | OpKind::Qr | OpKind::Slogdet | OpKind::Svd
        )
    }
}

// Struct literals (not const fn calls) so the `&[...]` lists are promoted to 'static
macro_rules! tensor {
    ($name:literal) => {
        Param {
            name: $name,
            kind: ParamKind::Tensor,
            default: ParamDefault::Required,
        }
    };
}

macro_rules! param {
    ($name:literal, $kind:ident, $($default:tt)+) => {
        Param {
            name: $name,
            kind: ParamKind::$kind,
            default: ParamDefault::$($default)+,
        }
    };
}

const fn spec(
    kind: OpKind,
    name: &'static str,
    params: &'static [Param],
    promotes: bool,
    out: bool,
    result: ResultDType,
) -> OpSpec {
    OpSpec {
        kind,
        name,
        params,
        promotes,
        out,
        nestable: true,
        result,
    }
}

use ResultDType as R;

const BINARY: &[Param] = &[
    param!("x1", TensorOrScalar, Required),
    param!("x2", TensorOrScalar, Required),
];
const PAIR: &[Param] = &[tensor!("x1"), tensor!("x2")];
const UNARY: &[Param] = &[tensor!("x")];
const UPLO: &[Param] = &[tensor!("x"), param!("uplo", Str, Str("L"))];

/// The operation table, in [`OpKind`] order
static OPS: [OpSpec; 32] = [
    spec(
        OpKind::Cholesky,
        "cholesky",
        &[tensor!("x"), param!("upper", Bool, Bool(false))],
        false,
        true,
        R::Float,
    ),
    spec(
        OpKind::Cross,
        "cross",
        &[tensor!("x1"), tensor!("x2"), param!("axis", Int, Int(-1))],
        true,
        true,
        R::Same,
    ),
    spec(OpKind::Det, "det", UNARY, false, true, R::Float),
    spec(
        OpKind::Diag,
        "diag",
        &[
            tensor!("x"),
            param!("offset", Int, Int(0)),
            param!("padding_value", Float, Float(0.0)),
            param!("num_rows", OptInt, None),
            param!("num_cols", OptInt, None),
        ],
        false,
        true,
        R::Same,
    ),
    spec(
        OpKind::Diagonal,
        "diagonal",
        &[
            tensor!("x"),
            param!("offset", Int, Int(0)),
            param!("axis1", Int, Int(-2)),
            param!("axis2", Int, Int(-1)),
        ],
        false,
        true,
        R::Same,
    ),
    spec(OpKind::Eigh, "eigh", UPLO, false, false, R::Float),
    spec(OpKind::Eigvalsh, "eigvalsh", UPLO, false, true, R::Float),
    spec(OpKind::Inner, "inner", PAIR, true, true, R::Same),
    spec(
        OpKind::Inv,
        "inv",
        &[tensor!("x"), param!("adjoint", Bool, Bool(false))],
        false,
        true,
        R::Float,
    ),
    spec(
        OpKind::Matmul,
        "matmul",
        &[
            tensor!("x1"),
            tensor!("x2"),
            param!("transpose_a", Bool, Bool(false)),
            param!("transpose_b", Bool, Bool(false)),
        ],
        true,
        true,
        R::Same,
    ),
    spec(
        OpKind::MatrixNorm,
        "matrix_norm",
        &[
            tensor!("x"),
            param!("ord", Ord, Str("fro")),
            param!("axis", Ints, Ints(&[-2, -1])),
            param!("keepdims", Bool, Bool(false)),
        ],
        false,
        true,
        R::Float,
    ),
    spec(
        OpKind::MatrixPower,
        "matrix_power",
        &[tensor!("x"), param!("n", Int, Required)],
        false,
        true,
        R::FloatIfNegative("n"),
    ),
    spec(
        OpKind::MatrixRank,
        "matrix_rank",
        &[
            tensor!("x"),
            param!("atol", OptFloat, None),
            param!("rtol", OptFloat, None),
        ],
        false,
        true,
        R::Index,
    ),
    spec(
        OpKind::MatrixTranspose,
        "matrix_transpose",
        UNARY,
        false,
        true,
        R::Same,
    ),
    spec(OpKind::Outer, "outer", PAIR, true, true, R::Same),
    spec(
        OpKind::Pinv,
        "pinv",
        &[tensor!("x"), param!("rtol", OptFloat, None)],
        false,
        true,
        R::Float,
    ),
    spec(
        OpKind::Qr,
        "qr",
        &[tensor!("x"), param!("mode", Str, Str("reduced"))],
        false,
        false,
        R::Float,
    ),
    spec(OpKind::Slogdet, "slogdet", UNARY, false, false, R::Float),
    spec(
        OpKind::Solve,
        "solve",
        &[
            tensor!("x1"),
            tensor!("x2"),
            param!("adjoint", Bool, Bool(false)),
        ],
        true,
        true,
        R::Float,
    ),
    spec(
        OpKind::Svd,
        "svd",
        &[
            tensor!("x"),
            param!("full_matrices", Bool, Bool(true)),
            param!("compute_uv", Bool, Bool(true)),
        ],
        false,
        false,
        R::Float,
    ),
    spec(OpKind::Svdvals, "svdvals", UNARY, false, true, R::Float),
    spec(
        OpKind::Tensordot,
        "tensordot",
        &[tensor!("x1"), tensor!("x2"), param!("axes", Axes, Int(2))],
        true,
        true,
        R::Same,
    ),
    spec(
        OpKind::Trace,
        "trace",
        &[
            tensor!("x"),
            param!("offset", Int, Int(0)),
            param!("axis1", Int, Int(0)),
            param!("axis2", Int, Int(1)),
        ],
        false,
        true,
        R::Same,
    ),
    spec(
        OpKind::Vecdot,
        "vecdot",
        &[tensor!("x1"), tensor!("x2"), param!("axis", Int, Int(-1))],
        true,
        true,
        R::Same,
    ),
    spec(
        OpKind::VectorNorm,
        "vector_norm",
        &[
            tensor!("x"),
            param!("axis", OptInts, None),
            param!("keepdims", Bool, Bool(false)),
            param!("ord", Ord, Float(2.0)),
        ],
        false,
        true,
        R::Float,
    ),
    spec(
        OpKind::VectorToSkewSymmetricMatrix,
        "vector_to_skew_symmetric_matrix",
        &[tensor!("vector")],
        false,
        true,
        R::Same,
    ),
    spec(
        OpKind::Vander,
        "vander",
        &[
            tensor!("x"),
            param!("N", OptInt, None),
            param!("increasing", Bool, Bool(false)),
        ],
        false,
        true,
        R::Same,
    ),
    spec(
        OpKind::LayerNorm,
        "layer_norm",
        &[
            tensor!("x"),
            param!("normalized_idxs", Ints, Required),
            param!("weight", Operand, None),
            param!("bias", Operand, None),
            param!("epsilon", Float, Float(1e-5)),
            param!("new_std", Float, Float(1.0)),
        ],
        false,
        true,
        R::Float,
    ),
    spec(OpKind::Add, "add", BINARY, true, true, R::Same),
    spec(OpKind::Subtract, "subtract", BINARY, true, true, R::Same),
    spec(OpKind::Multiply, "multiply", BINARY, true, true, R::Same),
    spec(OpKind::Divide, "divide", BINARY, true, true, R::Float),
];

impl OpKind {
    /// Every operation, in table order
    pub fn all() -> impl Iterator<Item = OpKind> {
        OPS.iter().map(|s| s.kind)
    }

    /// Static description of this operation
    pub fn spec(self) -> &'static OpSpec {
        &OPS[self as usize]
    }

    /// Name as exposed by the unified surface
    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OpKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        OPS.iter()
            .find(|spec| spec.name == s)
            .map(|spec| spec.kind)
            .ok_or_else(|| crate::error::Error::invalid_argument("op", "name", format!("unknown operation '{s}'")))
    }
}
