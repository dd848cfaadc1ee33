//! Handle identity for unified arrays

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static HANDLES: AtomicU64 = AtomicU64::new(1);

/// Identity of one [`Array`](super::Array) handle, shared by its clones.
///
/// Ids grow with creation order. A result written through `out` keeps the id
/// of the buffer it landed in, while a freshly computed result always
/// compares greater than every one of its inputs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArrayId(NonZeroU64);

impl ArrayId {
    pub(crate) fn next() -> Self {
        let n = HANDLES.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(n).unwrap_or(NonZeroU64::MIN))
    }

    /// Numeric value of the id
    #[inline]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ArrayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
