//! # Worker Pool Module
//!
//! A fixed number of named OS threads consuming a bounded FIFO queue.
//!
//! ## Module Structure
//!
//! ```text
//!     pool/
//!     ├── mod.rs          (You are here - Module organization)
//!     ├── config.rs       (Worker count, queue capacity, panic policy)
//!     ├── core.rs         (WorkerPool lifecycle and submission)
//!     ├── worker.rs       (Worker loop, completion tracking)
//!     └── metrics.rs      (PoolState, PoolStats)
//! ```
//!
//! ## Architecture Flow
//!
//! ```text
//!     submit(task)
//!          │
//!          ▼
//!     ┌─────────────┐   full: block until space
//!     │    Queue    │ ◄─────── or stop()
//!     └──────┬──────┘
//!            │ FIFO
//!            ▼
//!     ┌─────────────┐
//!     │   Workers   │ ◄── run task, mark finished
//!     └──────┬──────┘
//!            │
//!            ▼
//!     ┌─────────────┐
//!     │  Progress   │ ◄── pending count wakes wait()
//!     └─────────────┘
//! ```
//!
//! Shutdown is channel disconnection: `stop` drops the last sender, workers
//! drain what is left and see the queue closed.

mod config;
mod core;
mod metrics;
mod worker;

/// Pool settings
pub use config::{PanicPolicy, PoolConfig, DEFAULT_THREAD_NAME};

/// The pool itself
pub use core::{TrySubmitError, WorkerPool};

/// Observability
pub use metrics::{PoolState, PoolStats};

/// Boxed task type accepted by the queue
pub use worker::Task;
