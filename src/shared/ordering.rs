//! # Memory Ordering
//!
//! Selects the [`Ordering`] used by the atomic operations of
//! [`AtomicCounter`](crate::AtomicCounter).
//!
//! ```text
//!     Relaxed ──────► counts only, no happens-before edges
//!        │
//!     AcquireRelease ► counter publishes/observes surrounding writes (default)
//!        │
//!     Sequential ───► single global order across all SeqCst atomics
//! ```
//!
//! Every counter operation is one read-modify-write on a single atomic, so
//! increments are never lost under any of the three. The choice only
//! affects how the counter orders *other* memory around it.

use std::sync::atomic::Ordering;

/// Memory ordering strategy for counter operations.
///
/// ```rust
/// use pacekit::{AtomicCounter, MemoryOrdering};
///
/// // A statistics counter nobody synchronizes on
/// let hits = AtomicCounter::with_ordering(0, MemoryOrdering::Relaxed);
/// hits.increment(1);
/// assert_eq!(hits.get(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryOrdering {
    /// Atomicity only. Fine for statistics that no other data depends on.
    Relaxed,

    /// Loads acquire, stores release, read-modify-writes do both.
    #[default]
    AcquireRelease,

    /// Sequential consistency for every operation.
    Sequential,
}

impl MemoryOrdering {
    #[inline(always)]
    pub(crate) fn load(&self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::Acquire,
            Self::Sequential => Ordering::SeqCst,
        }
    }

    #[inline(always)]
    pub(crate) fn store(&self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::Release,
            Self::Sequential => Ordering::SeqCst,
        }
    }

    #[inline(always)]
    pub(crate) fn rmw(&self) -> Ordering {
        match self {
            Self::Relaxed => Ordering::Relaxed,
            Self::AcquireRelease => Ordering::AcqRel,
            Self::Sequential => Ordering::SeqCst,
        }
    }

    /// Ordering for the load performed when a compare-exchange fails.
    #[inline(always)]
    pub(crate) fn cas_failure(&self) -> Ordering {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_acquire_release() {
        assert_eq!(MemoryOrdering::default(), MemoryOrdering::AcquireRelease);
    }

    #[test]
    fn test_orderings_per_variant() {
        let cases = [
            (MemoryOrdering::Relaxed, Ordering::Relaxed, Ordering::Relaxed, Ordering::Relaxed),
            (MemoryOrdering::AcquireRelease, Ordering::Acquire, Ordering::Release, Ordering::AcqRel),
            (MemoryOrdering::Sequential, Ordering::SeqCst, Ordering::SeqCst, Ordering::SeqCst),
        ];

        for (ordering, load, store, rmw) in cases {
            assert_eq!(ordering.load(), load);
            assert_eq!(ordering.store(), store);
            assert_eq!(ordering.rmw(), rmw);
            assert_eq!(ordering.cas_failure(), load);
        }
    }
}
