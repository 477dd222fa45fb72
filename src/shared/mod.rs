//! # Shared State
//!
//! Standalone containers for state that tasks running on different threads
//! need to update together, such as result tallies or memoized lookups.
//!
//! ```text
//!     shared/
//!     ├── mod.rs       (You are here)
//!     ├── counter.rs   (AtomicCounter: lock-free i64)
//!     ├── cache.rs     (ConcurrentCache: RwLock-guarded map)
//!     ├── ordering.rs  (MemoryOrdering for the counter)
//!     └── utils.rs     (cache-line padding)
//! ```
//!
//! Neither container depends on the pool or the limiter.

mod cache;
mod counter;
mod ordering;
mod utils;

pub use cache::ConcurrentCache;
pub use counter::AtomicCounter;
pub use ordering::MemoryOrdering;
