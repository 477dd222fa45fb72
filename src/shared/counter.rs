//! # Atomic Counter
//!
//! A signed 64-bit counter that any number of threads can update at once.
//! Every mutation is a single hardware read-modify-write, so there is no
//! lock and no lost update:
//!
//! ```text
//!     Thread A: increment(1) ──┐
//!     Thread B: increment(1) ──┼──► fetch_add ──► value + 3
//!     Thread C: increment(1) ──┘
//! ```

use super::{ordering::MemoryOrdering, utils::CacheAligned};
use std::fmt;
use std::sync::atomic::AtomicI64;

/// Lock-free shared counter.
///
/// Arithmetic wraps on overflow, like the underlying atomic.
///
/// ```rust
/// use pacekit::AtomicCounter;
/// use std::sync::Arc;
/// use std::thread;
///
/// let counter = Arc::new(AtomicCounter::new(0));
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let counter = Arc::clone(&counter);
///         thread::spawn(move || {
///             for _ in 0..100 {
///                 counter.increment(1);
///             }
///         })
///     })
///     .collect();
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(counter.get(), 400);
/// ```
pub struct AtomicCounter {
    value: CacheAligned<AtomicI64>,
    ordering: MemoryOrdering,
}

impl AtomicCounter {
    /// Creates a counter starting at `initial`.
    pub fn new(initial: i64) -> Self {
        Self::with_ordering(initial, MemoryOrdering::default())
    }

    /// Creates a counter with an explicit memory ordering strategy.
    pub fn with_ordering(initial: i64, ordering: MemoryOrdering) -> Self {
        Self {
            value: CacheAligned::new(AtomicI64::new(initial)),
            ordering,
        }
    }

    /// Adds `delta` and returns the new value.
    #[inline]
    pub fn increment(&self, delta: i64) -> i64 {
        self.add(delta)
    }

    /// Subtracts `delta` and returns the new value.
    #[inline]
    pub fn decrement(&self, delta: i64) -> i64 {
        self.add(delta.wrapping_neg())
    }

    /// Adds `delta` (which may be negative) and returns the new value.
    #[inline]
    pub fn add(&self, delta: i64) -> i64 {
        self.value
            .get()
            .fetch_add(delta, self.ordering.rmw())
            .wrapping_add(delta)
    }

    /// Replaces the value.
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.get().store(value, self.ordering.store());
    }

    /// Reads the current value.
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.get().load(self.ordering.load())
    }

    /// Sets the value to zero and returns what it was before.
    #[inline]
    pub fn reset(&self) -> i64 {
        self.value.get().swap(0, self.ordering.rmw())
    }

    /// Replaces the value with `new` only if it still equals `current`.
    ///
    /// Returns `Ok(previous)` on success and `Err(actual)` otherwise.
    pub fn compare_and_swap(&self, current: i64, new: i64) -> Result<i64, i64> {
        self.value.get().compare_exchange(
            current,
            new,
            self.ordering.rmw(),
            self.ordering.cas_failure(),
        )
    }

    /// Returns the ordering strategy this counter was built with.
    #[inline]
    pub fn ordering(&self) -> MemoryOrdering {
        self.ordering
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for AtomicCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicCounter")
            .field("value", &self.get())
            .field("ordering", &self.ordering)
            .finish()
    }
}
