//! Typed option values for the unified surface

use crate::value::Value;

/// Which triangle of a symmetric matrix is read
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Uplo {
    /// Lower triangle
    #[default]
    Lower,
    /// Upper triangle
    Upper,
}

impl From<Uplo> for Value {
    fn from(uplo: Uplo) -> Self {
        Value::from(match uplo {
            Uplo::Lower => "L",
            Uplo::Upper => "U",
        })
    }
}

/// Shape of the factors returned by QR
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum QrMode {
    /// `Q` is `[m, k]`, `R` is `[k, n]` with `k = min(m, n)`
    #[default]
    Reduced,
    /// `Q` is `[m, m]`, `R` is `[m, n]`
    Complete,
}

impl From<QrMode> for Value {
    fn from(mode: QrMode) -> Self {
        Value::from(match mode {
            QrMode::Reduced => "reduced",
            QrMode::Complete => "complete",
        })
    }
}

/// Norm order for vector and matrix norms
///
/// Matrix norms accept `Frobenius`, `Nuclear`, `Inf`, `NegInf` and
/// `P(±1.0)` / `P(±2.0)`. Vector norms accept `Inf`, `NegInf` and any `P`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NormOrd {
    /// Frobenius norm
    Frobenius,
    /// Nuclear norm: sum of singular values
    Nuclear,
    /// Max norm
    Inf,
    /// Min norm
    NegInf,
    /// p-norm
    P(f64),
}

impl From<NormOrd> for Value {
    fn from(ord: NormOrd) -> Self {
        match ord {
            NormOrd::Frobenius => Value::from("fro"),
            NormOrd::Nuclear => Value::from("nuc"),
            NormOrd::Inf => Value::from("inf"),
            NormOrd::NegInf => Value::from("-inf"),
            NormOrd::P(p) => Value::Float(p),
        }
    }
}

/// Contraction axes for `tensordot`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TensordotAxes {
    /// Last `n` axes of `x1` against the first `n` axes of `x2`
    Count(usize),
    /// Explicit axis lists, paired in order
    Pairs(Vec<i64>, Vec<i64>),
}

impl Default for TensordotAxes {
    fn default() -> Self {
        Self::Count(2)
    }
}

impl From<TensordotAxes> for Value {
    fn from(axes: TensordotAxes) -> Self {
        match axes {
            TensordotAxes::Count(n) => Value::from(n),
            TensordotAxes::Pairs(a, b) => Value::Seq(vec![Value::from(a), Value::from(b)]),
        }
    }
}

/// Optional arguments of `layer_norm`
///
/// `weight` and `bias` may be arrays, numbers, number sequences, or
/// containers parallel to the input.
#[derive(Clone, Debug)]
pub struct LayerNormOptions {
    /// Scale applied after normalization
    pub weight: Value,
    /// Offset added last
    pub bias: Value,
    /// Added to the variance
    pub epsilon: f64,
    /// Standard deviation of the normalized output before scaling
    pub new_std: f64,
}

impl Default for LayerNormOptions {
    fn default() -> Self {
        Self {
            weight: Value::None,
            bias: Value::None,
            epsilon: 1e-5,
            new_std: 1.0,
        }
    }
}

impl LayerNormOptions {
    /// Defaults: no weight, no bias, `epsilon = 1e-5`, `new_std = 1`
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scale
    pub fn weight(mut self, weight: impl Into<Value>) -> Self {
        self.weight = weight.into();
        self
    }

    /// Set the offset
    pub fn bias(mut self, bias: impl Into<Value>) -> Self {
        self.bias = bias.into();
        self
    }

    /// Set the variance epsilon
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the output standard deviation
    pub fn new_std(mut self, new_std: f64) -> Self {
        self.new_std = new_std;
        self
    }
}
