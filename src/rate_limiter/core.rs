//! # Core Rate Limiter Implementation
//!
//! A token bucket whose refill is computed lazily. There is no timer
//! thread: every admission check converts the time elapsed since the last
//! refill into whole tokens and adds them, capped at capacity.
//!
//! ```text
//!     rate = 5/s, capacity = 5
//!
//!     t=0.00  [🪙🪙🪙🪙🪙]  allow() ×5 ──► all true
//!     t=0.01  [          ]  allow()    ──► false
//!     t=0.45  [🪙🪙      ]  0.44s × 5 = 2.2 ──► +2 tokens
//!     t=0.50  [🪙🪙      ]  0.05s × 5 = 0.25 ──► +0 (still accruing)
//! ```
//!
//! ## Truncation
//!
//! Earned tokens are truncated toward zero. The refill timestamp only moves
//! when at least one token is earned, and then it jumps to "now": time
//! short of a whole token keeps accruing, but the fractional remainder left
//! after a refill is dropped. Under steady polling a limiter therefore runs
//! slightly below its nominal rate, never above it.
//!
//! ## Locking
//!
//! The bucket sits behind one `parking_lot` mutex held only for the few
//! arithmetic operations of a check. Statistics live in separate atomics so
//! reading metrics never contends with the hot path for long.

use super::{config::RateLimiterConfig, metrics::RateLimiterMetrics};
use crate::cancel::CancellationToken;
use crate::error::Result;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Mutable bucket state, always accessed under the limiter's lock.
#[derive(Debug)]
struct Bucket {
    tokens: u64,
    last_refill: Instant,
    last_used: Instant,
}

/// Token-bucket admission gate.
///
/// ```rust
/// use pacekit::RateLimiter;
///
/// let limiter = RateLimiter::new(5);
/// for _ in 0..5 {
///     assert!(limiter.allow());
/// }
/// assert!(!limiter.allow());
/// ```
///
/// Share it between threads with `Arc`; every method takes `&self`.
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    config: RateLimiterConfig,

    total_allowed: AtomicU64,
    total_denied: AtomicU64,
    total_refills: AtomicU64,
}

impl RateLimiter {
    /// Creates a limiter admitting `rate` operations per second.
    ///
    /// A rate of zero is treated as one. The bucket starts full.
    #[inline]
    pub fn new(rate: u32) -> Self {
        Self::with_config(RateLimiterConfig::per_second(rate))
    }

    /// Creates a limiter from an explicit configuration.
    ///
    /// The configuration is [normalized](RateLimiterConfig::normalized)
    /// first, so construction never fails.
    pub fn with_config(config: RateLimiterConfig) -> Self {
        let config = config.normalized();
        let now = Instant::now();

        Self {
            bucket: Mutex::new(Bucket {
                tokens: config.capacity(),
                last_refill: now,
                last_used: now,
            }),
            config,
            total_allowed: AtomicU64::new(0),
            total_denied: AtomicU64::new(0),
            total_refills: AtomicU64::new(0),
        }
    }

    /// Takes one token if one is available. Never blocks.
    ///
    /// Returns `false`, with no effect other than refill bookkeeping, when
    /// the bucket is empty.
    pub fn allow(&self) -> bool {
        let now = Instant::now();

        let allowed = {
            let mut bucket = self.bucket.lock();
            self.refill(&mut bucket, now);
            bucket.last_used = now;

            if bucket.tokens > 0 {
                bucket.tokens -= 1;
                true
            } else {
                false
            }
        };

        if allowed {
            self.total_allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_denied.fetch_add(1, Ordering::Relaxed);
        }
        allowed
    }

    /// Blocks until a token is taken or `token` fires.
    ///
    /// Each round checks the cancellation token first, then calls
    /// [`allow`](Self::allow), then sleeps one
    /// [token spacing](RateLimiterConfig::token_spacing). A token that has
    /// already fired therefore never consumes a bucket token. An explicit
    /// `cancel()` wakes the sleeper immediately; a deadline is honoured to
    /// within the sleep granularity.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`] or [`Error::DeadlineExceeded`], depending on how
    /// the token fired. The limiter itself never fails a wait.
    ///
    /// ```rust
    /// use pacekit::{CancellationToken, RateLimiter};
    /// use std::time::Duration;
    ///
    /// let limiter = RateLimiter::new(100);
    /// let token = CancellationToken::with_timeout(Duration::from_secs(1));
    /// limiter.wait(&token).unwrap();
    /// ```
    ///
    /// [`Error::Cancelled`]: crate::Error::Cancelled
    /// [`Error::DeadlineExceeded`]: crate::Error::DeadlineExceeded
    pub fn wait(&self, token: &CancellationToken) -> Result<()> {
        let spacing = self.config.token_spacing();
        loop {
            token.check()?;
            if self.allow() {
                return Ok(());
            }
            token.sleep(spacing)?;
        }
    }

    /// [`wait`](Self::wait) with a fresh token that expires after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        self.wait(&CancellationToken::with_timeout(timeout))
    }

    /// Tokens available right now, after applying any pending refill.
    pub fn available_tokens(&self) -> u64 {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket, Instant::now());
        bucket.tokens
    }

    /// Bucket capacity, equal to the rate.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.config.capacity()
    }

    /// Tokens replenished per interval.
    #[inline]
    pub fn rate(&self) -> u32 {
        self.config.rate
    }

    /// Replenishment interval.
    #[inline]
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// The normalized configuration this limiter runs with.
    #[inline]
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Returns `true` if no admission check ran within `idle`.
    pub fn is_idle(&self, idle: Duration) -> bool {
        self.bucket.lock().last_used.elapsed() > idle
    }

    /// Refills the bucket to capacity and restarts the refill clock.
    ///
    /// Statistics are kept.
    pub fn reset(&self) {
        let mut bucket = self.bucket.lock();
        bucket.tokens = self.config.capacity();
        bucket.last_refill = Instant::now();
    }

    /// Snapshot of admission statistics and bucket level.
    pub fn metrics(&self) -> RateLimiterMetrics {
        RateLimiterMetrics {
            total_allowed: self.total_allowed.load(Ordering::Relaxed),
            total_denied: self.total_denied.load(Ordering::Relaxed),
            total_refills: self.total_refills.load(Ordering::Relaxed),
            current_tokens: self.available_tokens(),
            capacity: self.capacity(),
        }
    }

    /// Adds the whole tokens earned since the last refill.
    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        let earned = elapsed.as_secs_f64() / self.config.interval.as_secs_f64()
            * f64::from(self.config.rate);

        // Float-to-int casts saturate, so a limiter idle for years is fine
        let earned = earned as u64;
        if earned > 0 {
            bucket.tokens = bucket
                .tokens
                .saturating_add(earned)
                .min(self.config.capacity());
            bucket.last_refill = now;
            self.total_refills.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bucket = self.bucket.lock();
        f.debug_struct("RateLimiter")
            .field("tokens", &bucket.tokens)
            .field("capacity", &self.config.capacity())
            .field("rate", &self.config.rate)
            .field("interval", &self.config.interval)
            .finish()
    }
}
