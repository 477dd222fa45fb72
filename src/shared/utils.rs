//! Cache-line padding for hot atomics.
//!
//! ```text
//!     Without padding:
//!     ┌──────────────────────────────┐
//!     │ counter │ neighbour field    │ ← one cache line, every
//!     └──────────────────────────────┘   increment evicts the neighbour
//!
//!     With padding:
//!     ┌──────────────────────────────┐
//!     │ counter                      │ ← own line
//!     └──────────────────────────────┘
//! ```

/// Wrapper that places its value on its own cache line.
#[cfg_attr(target_arch = "aarch64", repr(C, align(128)))]
#[cfg_attr(not(target_arch = "aarch64"), repr(C, align(64)))]
pub(crate) struct CacheAligned<T>(pub(crate) T);

impl<T> CacheAligned<T> {
    #[inline(always)]
    pub(crate) const fn new(value: T) -> Self {
        Self(value)
    }

    #[inline(always)]
    pub(crate) fn get(&self) -> &T {
        &self.0
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for CacheAligned<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
