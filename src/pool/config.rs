//! # Worker Pool Configuration
//!
//! ```text
//!     PoolConfig::new(3)
//!
//!     ┌──────────── queue (capacity 2 × workers = 6) ─────────────┐
//!     │ task │ task │ task │      │      │      │  ◄── submit()    │
//!     └───────────────────────────────────────────────────────────┘
//!          │
//!          ├──► pacekit-worker-0
//!          ├──► pacekit-worker-1
//!          └──► pacekit-worker-2
//! ```
//!
//! Zero values are coerced, never rejected: zero workers become one, and a
//! zero queue capacity becomes the `2 × workers` default.

/// Thread name prefix used when none is configured.
pub const DEFAULT_THREAD_NAME: &str = "pacekit-worker";

/// What a worker does when a task panics.
///
/// ```text
///     Propagate (default)            Isolate
///     ───────────────────            ───────
///     task panics                    task panics
///        │                              │
///        ▼                              ▼
///     worker thread unwinds          catch_unwind, log error
///     and exits; pool shrinks        worker takes the next task
/// ```
///
/// Either way the panic is logged and counted in
/// [`PoolStats::panicked`](crate::PoolStats::panicked), and the task counts
/// as finished for [`WorkerPool::wait`](crate::WorkerPool::wait).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicPolicy {
    /// Let the panic unwind the worker thread. The thread is not replaced,
    /// so every panicking task permanently removes one worker.
    #[default]
    Propagate,

    /// Catch the panic at the task boundary and keep the worker running.
    Isolate,
}

/// Settings for a [`WorkerPool`](crate::WorkerPool).
///
/// ```rust
/// use pacekit::{PanicPolicy, PoolConfig};
///
/// let config = PoolConfig::new(4)
///     .with_queue_capacity(64)
///     .with_thread_name("ingest")
///     .with_panic_policy(PanicPolicy::Isolate);
///
/// assert_eq!(config.normalized().queue_capacity, 64);
/// assert_eq!(PoolConfig::new(0).normalized().workers, 1);
/// assert_eq!(PoolConfig::new(3).normalized().queue_capacity, 6);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub workers: usize,

    /// Maximum queued tasks before `submit` blocks. `0` means `2 × workers`.
    pub queue_capacity: usize,

    /// Worker threads are named `{thread_name}-{index}`.
    pub thread_name: String,

    /// Behaviour on task panic.
    pub panic_policy: PanicPolicy,
}

impl Default for PoolConfig {
    /// One worker per available CPU.
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(workers)
    }
}

impl PoolConfig {
    /// `workers` threads with the default queue capacity.
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            queue_capacity: 0,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            panic_policy: PanicPolicy::default(),
        }
    }

    /// Sets the queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the worker thread name prefix.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Sets the panic policy.
    pub fn with_panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.panic_policy = policy;
        self
    }

    /// Returns the configuration with zero values replaced by defaults.
    pub fn normalized(mut self) -> Self {
        self.workers = self.workers.max(1);
        if self.queue_capacity == 0 {
            self.queue_capacity = self.workers.saturating_mul(2);
        }
        if self.thread_name.is_empty() {
            self.thread_name = DEFAULT_THREAD_NAME.to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_workers_coerced() {
        let config = PoolConfig::new(0).normalized();
        assert_eq!(config.workers, 1);
        assert_eq!(config.queue_capacity, 2);
    }

    #[test]
    fn test_default_queue_capacity() {
        assert_eq!(PoolConfig::new(10).normalized().queue_capacity, 20);
    }

    #[test]
    fn test_explicit_values_kept() {
        let config = PoolConfig::new(2)
            .with_queue_capacity(1)
            .with_thread_name("io")
            .with_panic_policy(PanicPolicy::Isolate)
            .normalized();

        assert_eq!(config.workers, 2);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.thread_name, "io");
        assert_eq!(config.panic_policy, PanicPolicy::Isolate);
    }

    #[test]
    fn test_empty_thread_name_restored() {
        let config = PoolConfig::new(1).with_thread_name("").normalized();
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
    }

    #[test]
    fn test_default_uses_available_parallelism() {
        assert!(PoolConfig::default().workers >= 1);
        assert_eq!(PanicPolicy::default(), PanicPolicy::Propagate);
    }
}
