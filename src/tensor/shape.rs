//! Shape type and broadcasting rules

use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;
use std::ops::Deref;

/// Inline capacity of a [`Shape`]; deeper shapes spill to the heap
pub(crate) const STACK_DIMS: usize = 4;

/// Most elements one buffer may hold: an f64 buffer must stay within
/// `isize::MAX` bytes
const MAX_ELEMENTS: usize = isize::MAX as usize / std::mem::size_of::<f64>();

/// Dimensions of an array, outermost first
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape(SmallVec<[usize; STACK_DIMS]>);

impl Shape {
    /// The 0-d shape
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a trailing dimension
    pub fn push(&mut self, dim: usize) {
        self.0.push(dim);
    }

    /// Append several trailing dimensions
    pub fn extend_from_slice(&mut self, dims: &[usize]) {
        self.0.extend_from_slice(dims);
    }

    /// Dimensions as a slice
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Rank
    #[inline]
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Element count; a 0-d shape holds one element
    #[inline]
    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    /// Element count, `None` when it overflows or no buffer could hold it
    pub fn checked_numel(&self) -> Option<usize> {
        self.0
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .filter(|&n| n <= MAX_ELEMENTS)
    }

    /// Row-major contiguous strides, in elements.
    pub fn strides(&self) -> SmallVec<[usize; STACK_DIMS]> {
        let mut strides: SmallVec<[usize; STACK_DIMS]> = SmallVec::from_elem(1, self.0.len());
        for i in (0..self.0.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.0[i + 1];
        }
        strides
    }
}

impl Deref for Shape {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<[usize]> for Shape {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self(SmallVec::from_slice(dims))
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self(SmallVec::from_vec(dims))
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::from(&dims[..])
    }
}

impl FromIterator<usize> for Shape {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Broadcast two shapes against each other.
///
/// Dimensions are aligned from the right; absent dimensions count as 1 and a
/// size-1 dimension stretches to match the other side.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Shape> {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let lead = long.len() - short.len();
    let mut out = Shape::from(&long[..lead]);
    for (&x, &y) in long[lead..].iter().zip(short) {
        let dim = match (x, y) {
            _ if x == y => x,
            (1, _) => y,
            (_, 1) => x,
            _ => return Err(Error::shape_mismatch(a, b)),
        };
        out.push(dim);
    }
    Ok(out)
}

/// Broadcast any number of shapes together.
pub fn broadcast_all<S: AsRef<[usize]>>(shapes: &[S]) -> Result<Shape> {
    shapes
        .iter()
        .try_fold(Shape::new(), |acc, s| broadcast_shapes(&acc, s.as_ref()))
}

/// Resolve a possibly negative axis against `ndim`.
pub fn normalize_axis(axis: isize, ndim: usize) -> Result<usize> {
    let resolved = if axis < 0 { axis + ndim as isize } else { axis };
    if resolved < 0 || resolved as usize >= ndim {
        return Err(Error::InvalidAxis { axis, ndim });
    }
    Ok(resolved as usize)
}
