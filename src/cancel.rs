//! # Cancellation Tokens
//!
//! A [`CancellationToken`] is the external signal a blocking call watches so
//! the caller can give up on it. It fires in one of two ways:
//!
//! ```text
//!     token.cancel()          ──► Error::Cancelled         (explicit)
//!     Instant::now() ≥ deadline ─► Error::DeadlineExceeded  (timeout)
//! ```
//!
//! Tokens are cheap handles around shared state: clone one and hand the
//! clone to another thread to cancel from there. Every clone observes the
//! same signal.
//!
//! ```rust
//! use pacekit::CancellationToken;
//! use std::time::Duration;
//!
//! let token = CancellationToken::with_timeout(Duration::from_secs(5));
//! let remote = token.clone();
//!
//! std::thread::spawn(move || remote.cancel());
//! // `token` now reports cancellation to any `RateLimiter::wait` using it.
//! ```

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Shared cancellation signal with an optional deadline.
///
/// Sleeping through [`CancellationToken::sleep`] parks the calling thread on
/// a condition variable, so an explicit [`cancel`](Self::cancel) wakes it at
/// once instead of after the sleep elapses.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

struct Inner {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Creates a token that only fires when [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a token that fires `timeout` from now, or earlier on `cancel`.
    ///
    /// A timeout too large to represent as an [`Instant`] means "no deadline".
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Instant::now().checked_add(timeout))
    }

    /// Creates a token that fires at `deadline`, or earlier on `cancel`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(Some(deadline))
    }

    fn build(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: Mutex::new(false),
                wakeup: Condvar::new(),
                deadline,
            }),
        }
    }

    /// Cancels the token and wakes every thread sleeping on it.
    ///
    /// Cancelling more than once has no further effect.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        if !*cancelled {
            *cancelled = true;
            self.inner.wakeup.notify_all();
            debug!("Cancellation token cancelled");
        }
    }

    /// Returns `true` once the token was cancelled or its deadline passed.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Returns the deadline, if the token has one.
    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Returns the time left until the deadline, if the token has one.
    ///
    /// Returns `Some(Duration::ZERO)` once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Checks the token without blocking.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if [`cancel`](Self::cancel) was called
    /// - [`Error::DeadlineExceeded`] if the deadline has passed
    pub fn check(&self) -> Result<()> {
        let cancelled = *self.inner.cancelled.lock();
        self.status(cancelled, Instant::now())
    }

    fn status(&self, cancelled: bool, now: Instant) -> Result<()> {
        if cancelled {
            return Err(Error::Cancelled);
        }
        match self.inner.deadline {
            Some(deadline) if now >= deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Sleeps for `duration` unless the token fires first.
    ///
    /// Returns `Ok(())` after sleeping the full duration. Returns the
    /// cancellation error as soon as the token is cancelled, or when the
    /// deadline falls inside the sleep.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let wake_at = Instant::now().checked_add(duration);
        let mut cancelled = self.inner.cancelled.lock();

        loop {
            let now = Instant::now();
            self.status(*cancelled, now)?;

            let until = match (wake_at, self.inner.deadline) {
                (Some(wake_at), _) if now >= wake_at => return Ok(()),
                (Some(wake_at), Some(deadline)) => Some(wake_at.min(deadline)),
                (Some(wake_at), None) => Some(wake_at),
                (None, deadline) => deadline,
            };

            match until {
                Some(until) => {
                    self.inner.wakeup.wait_until(&mut cancelled, until);
                }
                None => self.inner.wakeup.wait(&mut cancelled),
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &*self.inner.cancelled.lock())
            .field("deadline", &self.inner.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fresh_token_is_live() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
        assert!(token.deadline().is_none());
        assert!(token.remaining().is_none());
    }

    #[test]
    fn test_cancel_is_sticky_and_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();

        clone.cancel();
        clone.cancel();

        assert!(token.is_cancelled());
        assert_eq!(token.check(), Err(Error::Cancelled));
    }

    #[test]
    fn test_deadline_expires() {
        let token = CancellationToken::with_timeout(Duration::from_millis(20));
        assert!(token.check().is_ok());

        thread::sleep(Duration::from_millis(40));
        assert_eq!(token.check(), Err(Error::DeadlineExceeded));
        assert_eq!(token.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_cancel_wins_over_deadline() {
        let token = CancellationToken::with_deadline(Instant::now());
        token.cancel();
        assert_eq!(token.check(), Err(Error::Cancelled));
    }

    #[test]
    fn test_sleep_completes() {
        let token = CancellationToken::new();
        let start = Instant::now();
        assert!(token.sleep(Duration::from_millis(20)).is_ok());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_sleep_truncated_by_deadline() {
        let token = CancellationToken::with_timeout(Duration::from_millis(20));
        let start = Instant::now();
        assert_eq!(
            token.sleep(Duration::from_secs(10)),
            Err(Error::DeadlineExceeded)
        );
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_cancel_wakes_sleeper() {
        let token = CancellationToken::new();
        let sleeper = token.clone();

        let handle = thread::spawn(move || {
            let start = Instant::now();
            let result = sleeper.sleep(Duration::from_secs(30));
            (result, start.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        token.cancel();

        let (result, elapsed) = handle.join().unwrap();
        assert_eq!(result, Err(Error::Cancelled));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_debug_impl() {
        let token = CancellationToken::new();
        let debug = format!("{:?}", token);
        assert!(debug.contains("CancellationToken"));
        assert!(debug.contains("cancelled: false"));
    }
}
