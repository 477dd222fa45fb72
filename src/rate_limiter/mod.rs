//! # Rate Limiter Module
//!
//! Token-bucket admission control, single and keyed.
//!
//! ## Module Structure
//!
//! ```text
//!     rate_limiter/
//!     ├── mod.rs          (You are here - Module organization)
//!     ├── config.rs       (Rate, interval and their coercion)
//!     ├── core.rs         (Lazily refilled token bucket)
//!     ├── keyed.rs        (One limiter per key, idle cleanup)
//!     └── metrics.rs      (Admission statistics and health)
//! ```
//!
//! ## Architecture Flow
//!
//! ```text
//!     allow() / wait(token)
//!            │
//!            ▼
//!     ┌─────────────┐
//!     │    Keyed    │ ◄── optional: pick the limiter for a key
//!     └──────┬──────┘
//!            │
//!            ▼
//!     ┌─────────────┐
//!     │    Core     │ ◄── lazy refill, take one token
//!     └──────┬──────┘
//!            │
//!            ▼
//!     ┌─────────────┐
//!     │   Metrics   │ ◄── allowed / denied / refills
//!     └─────────────┘
//! ```

mod config;
mod core;
mod keyed;
mod metrics;

/// Rate, interval and coercion rules
pub use config::{RateLimiterConfig, DEFAULT_INTERVAL, MIN_POLL_INTERVAL};

/// The token bucket itself
pub use core::RateLimiter;

/// Per-key limiter families
pub use keyed::{CleanupHandle, KeyedRateLimiter, KeyedStats};

/// Observability
pub use metrics::{HealthStatus, RateLimiterMetrics};
