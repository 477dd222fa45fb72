//! # Errors
//!
//! Every fallible operation in this crate returns [`Error`]. There are only
//! two sources of failure:
//!
//! ```text
//!     WorkerPool::submit ──► pool shut down ──────────► Error::PoolClosed
//!
//!     RateLimiter::wait ───► token.cancel() ──────────► Error::Cancelled
//!                       └──► token deadline elapsed ──► Error::DeadlineExceeded
//! ```
//!
//! Constructors never fail: out-of-range arguments are coerced to the
//! smallest safe value instead. A denied [`RateLimiter::allow`] is a normal
//! `false`, not an error.
//!
//! [`RateLimiter::allow`]: crate::RateLimiter::allow

use thiserror::Error;

/// Errors returned by the pool and the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The worker pool has been signaled to stop and accepts no more tasks.
    #[error("worker pool is closed")]
    PoolClosed,

    /// The cancellation token was cancelled before the operation completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The cancellation token's deadline elapsed before the operation completed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// Returns `true` for [`Error::Cancelled`] and [`Error::DeadlineExceeded`].
    #[inline]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::PoolClosed.to_string(), "worker pool is closed");
        assert_eq!(Error::Cancelled.to_string(), "operation cancelled");
        assert_eq!(Error::DeadlineExceeded.to_string(), "deadline exceeded");
    }

    #[test]
    fn test_is_cancellation() {
        assert!(Error::Cancelled.is_cancellation());
        assert!(Error::DeadlineExceeded.is_cancellation());
        assert!(!Error::PoolClosed.is_cancellation());
    }
}
