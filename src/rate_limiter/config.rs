//! # Rate Limiter Configuration
//!
//! A limiter is described by two numbers: how many tokens it hands out per
//! interval, and how long the interval is. The bucket holds exactly one
//! interval's worth of tokens, so bursts never exceed the rate.
//!
//! ```text
//!     RateLimiterConfig { rate: 5, interval: 1s }
//!
//!     ┌───────────────────────┐
//!     │ 🪙 🪙 🪙 🪙 🪙         │ ← capacity = rate = 5
//!     └───────────────────────┘
//!       one token earned every interval / rate = 200ms
//! ```
//!
//! Out-of-range values are coerced rather than rejected: a zero rate
//! becomes 1 and a zero interval becomes [`DEFAULT_INTERVAL`].

use std::time::Duration;

/// Replenishment interval used when none is given.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest sleep between two polls of a blocked [`wait`].
///
/// Very high rates would otherwise turn `wait` into a busy loop.
///
/// [`wait`]: crate::RateLimiter::wait
pub const MIN_POLL_INTERVAL: Duration = Duration::from_micros(50);

/// Parameters of a token-bucket limiter.
///
/// ```rust
/// use pacekit::RateLimiterConfig;
/// use std::time::Duration;
///
/// let config = RateLimiterConfig::per_second(100);
/// assert_eq!(config.capacity(), 100);
///
/// // 30 tokens every 500ms is 60 per second
/// let config = RateLimiterConfig::new(30, Duration::from_millis(500));
/// assert_eq!(config.effective_rate_per_second(), 60.0);
///
/// // Zero values are coerced, never rejected
/// let config = RateLimiterConfig::new(0, Duration::ZERO).normalized();
/// assert_eq!(config.rate, 1);
/// assert_eq!(config.interval, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Tokens replenished per interval. Also the bucket capacity.
    pub rate: u32,

    /// Length of one replenishment interval.
    pub interval: Duration,
}

impl Default for RateLimiterConfig {
    /// Ten tokens per second.
    fn default() -> Self {
        Self::per_second(10)
    }
}

impl RateLimiterConfig {
    /// Creates a configuration handing out `rate` tokens every `interval`.
    pub fn new(rate: u32, interval: Duration) -> Self {
        Self { rate, interval }
    }

    /// `rate` tokens per second.
    pub fn per_second(rate: u32) -> Self {
        Self::new(rate, DEFAULT_INTERVAL)
    }

    /// `rate` tokens per minute.
    pub fn per_minute(rate: u32) -> Self {
        Self::new(rate, Duration::from_secs(60))
    }

    /// Replaces the interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Returns the configuration with zero values coerced to safe minimums.
    pub fn normalized(self) -> Self {
        Self {
            rate: self.rate.max(1),
            interval: if self.interval.is_zero() {
                DEFAULT_INTERVAL
            } else {
                self.interval
            },
        }
    }

    /// Maximum tokens the bucket holds.
    #[inline]
    pub fn capacity(&self) -> u64 {
        u64::from(self.rate.max(1))
    }

    /// Expected time between two tokens: `interval / rate`, never shorter
    /// than [`MIN_POLL_INTERVAL`].
    pub fn token_spacing(&self) -> Duration {
        let config = self.normalized();
        (config.interval / config.rate).max(MIN_POLL_INTERVAL)
    }

    /// Sustained tokens per second this configuration allows.
    pub fn effective_rate_per_second(&self) -> f64 {
        let config = self.normalized();
        f64::from(config.rate) / config.interval.as_secs_f64()
    }
}
