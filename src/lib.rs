//! # Pacekit - Bounded Concurrency Primitives for Rust
//!
//! Four small building blocks for programs that must do a lot of work
//! without doing too much of it at once:
//!
//! - [`WorkerPool`] - a fixed set of threads draining a bounded FIFO queue,
//!   with back-pressure on submit and graceful shutdown
//! - [`RateLimiter`] - a token bucket with non-blocking [`allow`](RateLimiter::allow)
//!   and cancellable [`wait`](RateLimiter::wait)
//! - [`AtomicCounter`] - a cache-line padded signed counter
//! - [`ConcurrentCache`] - a string-keyed map with atomic get-or-insert
//!
//! ## The Token Bucket
//!
//! ```text
//!     RateLimiter::new(5)          capacity = rate = 5 per second
//!
//!     t = 0.0s   [●●●●●]  starts full
//!     5 × allow  [     ]  true, true, true, true, true
//!     allow      [     ]  false (never blocks)
//!     t = 0.4s   [●●   ]  2 tokens earned, remainder dropped
//!     t = 1.4s   [●●●●●]  capped at capacity
//! ```
//!
//! Tokens are computed lazily on each call from elapsed monotonic time; no
//! background thread refills the bucket.
//!
//! ## Quick Start
//!
//! ### Worker pool
//!
//! ```rust
//! use pacekit::WorkerPool;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let pool = WorkerPool::new(3);
//! pool.start();
//!
//! let done = Arc::new(AtomicUsize::new(0));
//! for _ in 0..10 {
//!     let done = Arc::clone(&done);
//!     pool.submit(move || {
//!         done.fetch_add(1, Ordering::SeqCst);
//!     })?;
//! }
//!
//! pool.wait();
//! pool.stop();
//! assert_eq!(done.load(Ordering::SeqCst), 10);
//! # Ok::<(), pacekit::Error>(())
//! ```
//!
//! ### Rate limiting
//!
//! ```rust
//! use pacekit::{CancellationToken, RateLimiter};
//! use std::time::Duration;
//!
//! let limiter = RateLimiter::new(100);
//!
//! if limiter.allow() {
//!     // handle the request
//! }
//!
//! // Block for a token, giving up after 50ms
//! let token = CancellationToken::with_timeout(Duration::from_millis(50));
//! limiter.wait(&token)?;
//! # Ok::<(), pacekit::Error>(())
//! ```
//!
//! ### Shared state
//!
//! ```rust
//! use pacekit::{AtomicCounter, ConcurrentCache};
//!
//! let hits = AtomicCounter::new(0);
//! assert_eq!(hits.increment(1), 1);
//!
//! let cache = ConcurrentCache::new();
//! assert_eq!(cache.get_or_set("region", "eu-west"), ("eu-west", false));
//! assert_eq!(cache.get_or_set("region", "us-east"), ("eu-west", true));
//! ```
//!
//! ## Architecture Overview
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │   Your Application      │
//!                    └──────────┬──────────────┘
//!                               │
//!          ┌────────────────────┼─────────────────────┐
//!          │                    │                     │
//!     ┌────▼─────────┐   ┌──────▼────────┐   ┌────────▼────────┐
//!     │ WorkerPool   │   │ RateLimiter   │   │ Shared state    │
//!     ├──────────────┤   ├───────────────┤   ├─────────────────┤
//!     │ bounded FIFO │   │ lazy refill   │   │ AtomicCounter   │
//!     │ named threads│   │ allow / wait  │   │ ConcurrentCache │
//!     │ drain on stop│   │ keyed family  │   │                 │
//!     └──────────────┘   └───────┬───────┘   └─────────────────┘
//!                                │
//!                       ┌────────▼──────────┐
//!                       │ CancellationToken │
//!                       └───────────────────┘
//! ```
//!
//! ## Logging
//!
//! Lifecycle events are emitted through [`tracing`]: pool start and stop at
//! `info`, worker threads at `debug`, discarded tasks at `warn`, panics and
//! spawn failures at `error`. Install any subscriber to see them; the crate
//! never installs one itself.
//!
//! ## Thread Safety
//!
//! Every public type is `Send + Sync`. Share them with `Arc`, see
//! [`SharedRateLimiter`] and [`SharedPool`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations
)]
#![forbid(unsafe_code)]

mod cancel;
mod error;
mod pool;
mod rate_limiter;
mod shared;

pub use cancel::CancellationToken;
pub use error::{Error, Result};
pub use pool::{
    PanicPolicy, PoolConfig, PoolState, PoolStats, Task, TrySubmitError, WorkerPool,
    DEFAULT_THREAD_NAME,
};
pub use rate_limiter::{
    CleanupHandle, HealthStatus, KeyedRateLimiter, KeyedStats, RateLimiter, RateLimiterConfig,
    RateLimiterMetrics, DEFAULT_INTERVAL, MIN_POLL_INTERVAL,
};
pub use shared::{AtomicCounter, ConcurrentCache, MemoryOrdering};

use std::time::Duration;

/// A rate limiter wrapped in `Arc` for sharing across threads.
///
/// # Example
/// ```rust
/// use pacekit::{RateLimiter, SharedRateLimiter};
/// use std::sync::Arc;
///
/// let shared: SharedRateLimiter = Arc::new(RateLimiter::new(100));
///
/// let limiter = shared.clone();
/// std::thread::spawn(move || {
///     limiter.allow();
/// })
/// .join()
/// .unwrap();
/// ```
pub type SharedRateLimiter = std::sync::Arc<RateLimiter>;

/// A worker pool wrapped in `Arc`, for submitting from several threads.
pub type SharedPool = std::sync::Arc<WorkerPool>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum supported Rust version.
pub const MSRV: &str = "1.70.0";

/// Prelude module for convenient imports.
///
/// ```rust
/// use pacekit::prelude::*;
/// ```
pub mod prelude {
    //! Common imports for typical use.
    //!
    //! # Example
    //! ```rust
    //! use pacekit::prelude::*;
    //!
    //! let pool = WorkerPool::new(2);
    //! let limiter = RateLimiter::new(10);
    //! let token = CancellationToken::new();
    //! let counter = AtomicCounter::new(0);
    //! ```

    pub use crate::{
        AtomicCounter, CancellationToken, ConcurrentCache, Error, HealthStatus,
        KeyedRateLimiter, MemoryOrdering, PanicPolicy, PoolConfig, PoolState, PoolStats,
        RateLimiter, RateLimiterConfig, RateLimiterMetrics, Result, SharedPool,
        SharedRateLimiter, WorkerPool,
    };
}

/// Fluent construction of a [`RateLimiter`].
///
/// # Example
///
/// ```rust
/// use pacekit::RateLimiterBuilder;
/// use std::time::Duration;
///
/// // 100 requests per minute, bursts of up to 100
/// let limiter = RateLimiterBuilder::new()
///     .rate(100)
///     .interval(Duration::from_secs(60))
///     .build();
///
/// assert_eq!(limiter.capacity(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiterBuilder {
    config: RateLimiterConfig,
}

impl RateLimiterBuilder {
    /// Starts from the default: 10 tokens per second.
    pub fn new() -> Self {
        Self {
            config: RateLimiterConfig::default(),
        }
    }

    /// Tokens earned per interval; also the burst capacity.
    pub fn rate(mut self, rate: u32) -> Self {
        self.config.rate = rate;
        self
    }

    /// Length of one refill interval. Zero is treated as one second.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Builds the limiter. Never fails; zero values are coerced.
    pub fn build(self) -> RateLimiter {
        RateLimiter::with_config(self.config)
    }

    /// Builds the limiter wrapped in an `Arc`.
    pub fn build_shared(self) -> SharedRateLimiter {
        std::sync::Arc::new(self.build())
    }
}

impl Default for RateLimiterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent construction of a [`WorkerPool`].
///
/// # Example
///
/// ```rust
/// use pacekit::{PanicPolicy, WorkerPoolBuilder};
///
/// let pool = WorkerPoolBuilder::new()
///     .workers(4)
///     .queue_capacity(32)
///     .thread_name("ingest")
///     .panic_policy(PanicPolicy::Isolate)
///     .start();
///
/// pool.submit(|| {}).unwrap();
/// pool.wait();
/// ```
#[derive(Debug, Clone, Default)]
pub struct WorkerPoolBuilder {
    config: PoolConfig,
}

impl WorkerPoolBuilder {
    /// Starts from the default: one worker per CPU, queue of twice that.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of worker threads.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Queue capacity; `0` keeps the `2 × workers` default.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Worker thread name prefix.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Behaviour when a task panics.
    pub fn panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.config.panic_policy = policy;
        self
    }

    /// Builds the pool without spawning threads.
    pub fn build(self) -> WorkerPool {
        WorkerPool::with_config(self.config)
    }

    /// Builds and starts the pool.
    pub fn start(self) -> WorkerPool {
        let pool = self.build();
        pool.start();
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_basic_functionality() {
        let limiter = RateLimiter::new(10);

        for _ in 0..10 {
            assert!(limiter.allow());
        }
        assert!(!limiter.allow());

        let metrics = limiter.metrics();
        assert_eq!(metrics.total_allowed, 10);
        assert_eq!(metrics.total_denied, 1);
    }

    #[test]
    fn test_rate_limiter_builder() {
        let limiter = RateLimiterBuilder::new()
            .rate(50)
            .interval(Duration::from_millis(500))
            .build();

        assert_eq!(limiter.available_tokens(), 50);
        assert_eq!(limiter.interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_builder_coerces_zero() {
        let limiter = RateLimiterBuilder::new()
            .rate(0)
            .interval(Duration::ZERO)
            .build();

        assert_eq!(limiter.capacity(), 1);
        assert_eq!(limiter.interval(), DEFAULT_INTERVAL);
    }

    #[test]
    fn test_pool_builder() {
        let pool = WorkerPoolBuilder::new()
            .workers(2)
            .queue_capacity(0)
            .thread_name("builder")
            .build();

        assert_eq!(pool.worker_count(), 2);
        assert_eq!(pool.queue_capacity(), 4);
        assert_eq!(pool.state(), PoolState::Created);
        assert_eq!(pool.config().thread_name, "builder");
    }

    #[test]
    fn test_thread_safety() {
        let limiter: SharedRateLimiter = RateLimiterBuilder::new()
            .rate(1000)
            .interval(Duration::from_secs(60))
            .build_shared();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || (0..200).filter(|_| limiter.allow()).count())
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        // A minute-long interval leaves no room for refills during the test
        assert_eq!(total, 1000);
    }

    #[test]
    fn test_shared_pool() {
        let pool: SharedPool = Arc::new(WorkerPoolBuilder::new().workers(2).start());
        let counter = Arc::new(AtomicUsize::new(0));

        let submitters: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..25 {
                        let counter = Arc::clone(&counter);
                        pool.submit(move || {
                            counter.fetch_add(1, Ordering::SeqCst);
                        })
                        .unwrap();
                    }
                })
            })
            .collect();

        for submitter in submitters {
            submitter.join().unwrap();
        }
        pool.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let _pool = WorkerPool::new(1);
        let _limiter = RateLimiter::new(1);
        let _config = RateLimiterConfig::default();
        let _ordering = MemoryOrdering::AcquireRelease;
        let _status = HealthStatus::Healthy;
        let _cache: ConcurrentCache<u8> = ConcurrentCache::new();
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(MSRV, "1.70.0");
    }
}
