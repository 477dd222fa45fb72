//! # Rate Limiter Metrics
//!
//! Point-in-time counters for a single limiter, plus a coarse health
//! verdict derived from them.
//!
//! ```text
//!     ┌─────────────────────────────────────┐
//!     │  Allowed: 85   Denied: 15           │
//!     │  Success Rate: 85%                  │
//!     │  Tokens: 2/10  ▓▓░░░░░░░░           │
//!     │  Health: Healthy                    │
//!     └─────────────────────────────────────┘
//! ```

use std::fmt;

/// Snapshot of a limiter's activity.
///
/// ```rust
/// use pacekit::RateLimiter;
///
/// let limiter = RateLimiter::new(2);
/// limiter.allow();
/// limiter.allow();
/// limiter.allow();
///
/// let metrics = limiter.metrics();
/// assert_eq!(metrics.total_allowed, 2);
/// assert_eq!(metrics.total_denied, 1);
/// println!("{}", metrics.summary());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterMetrics {
    /// Admission checks that took a token.
    pub total_allowed: u64,

    /// Admission checks that found the bucket empty.
    pub total_denied: u64,

    /// Lazy refills that added at least one token.
    pub total_refills: u64,

    /// Tokens in the bucket when the snapshot was taken.
    pub current_tokens: u64,

    /// Bucket capacity.
    pub capacity: u64,
}

impl RateLimiterMetrics {
    /// Fraction of checks that were allowed, `1.0` before any check.
    #[inline]
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            1.0
        } else {
            self.total_allowed as f64 / total as f64
        }
    }

    /// Fraction of checks that were denied.
    #[inline]
    pub fn denial_rate(&self) -> f64 {
        1.0 - self.success_rate()
    }

    /// Share of the bucket currently spent: `0.0` full, `1.0` empty.
    #[inline]
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            1.0 - (self.current_tokens as f64 / self.capacity as f64)
        }
    }

    /// Allowed plus denied checks.
    #[inline]
    pub fn total_requests(&self) -> u64 {
        self.total_allowed + self.total_denied
    }

    /// The bucket is empty, or most checks are being denied.
    #[inline]
    pub fn is_under_pressure(&self) -> bool {
        self.current_tokens == 0 || self.success_rate() < 0.5
    }

    /// Health verdict:
    /// - `Critical`: bucket empty and more than 30% of checks denied
    /// - `Degraded`: under pressure
    /// - `Healthy`: otherwise
    pub fn health_status(&self) -> HealthStatus {
        if self.current_tokens == 0 && self.denial_rate() > 0.3 {
            HealthStatus::Critical
        } else if self.is_under_pressure() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Multi-line report suitable for logs.
    pub fn summary(&self) -> String {
        format!(
            "RateLimiter Metrics:\n\
             ├─ Admission:\n\
             │  ├─ Allowed: {}\n\
             │  ├─ Denied: {}\n\
             │  └─ Success Rate: {:.2}%\n\
             ├─ Bucket:\n\
             │  ├─ Tokens: {}/{}\n\
             │  ├─ Utilization: {:.2}%\n\
             │  └─ Refills: {}\n\
             └─ Health: {}",
            self.total_allowed,
            self.total_denied,
            self.success_rate() * 100.0,
            self.current_tokens,
            self.capacity,
            self.utilization() * 100.0,
            self.total_refills,
            self.health_status(),
        )
    }
}

impl fmt::Display for RateLimiterMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Coarse health of a limiter.
///
/// ```text
///     Healthy ──► tokens available, most checks pass
///        │
///     Degraded ─► bucket empty or most checks denied
///        │
///     Critical ─► bucket empty and denials piling up
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Operating normally.
    Healthy,
    /// Under some pressure.
    Degraded,
    /// Demand well above the configured rate.
    Critical,
}

impl HealthStatus {
    /// Returns `true` for anything but `Healthy`.
    pub fn is_unhealthy(&self) -> bool {
        !matches!(self, Self::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => f.write_str("Healthy"),
            Self::Degraded => f.write_str("Degraded"),
            Self::Critical => f.write_str("Critical"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(allowed: u64, denied: u64, tokens: u64) -> RateLimiterMetrics {
        RateLimiterMetrics {
            total_allowed: allowed,
            total_denied: denied,
            total_refills: 0,
            current_tokens: tokens,
            capacity: 10,
        }
    }

    #[test]
    fn test_rates() {
        let m = metrics(80, 20, 5);
        assert_eq!(m.total_requests(), 100);
        assert_eq!(m.success_rate(), 0.8);
        assert!((m.denial_rate() - 0.2).abs() < 1e-9);
        assert_eq!(m.utilization(), 0.5);
    }

    #[test]
    fn test_no_requests_is_full_success() {
        let m = metrics(0, 0, 10);
        assert_eq!(m.success_rate(), 1.0);
        assert_eq!(m.utilization(), 0.0);
        assert_eq!(m.health_status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_health_levels() {
        assert_eq!(metrics(90, 10, 3).health_status(), HealthStatus::Healthy);
        assert_eq!(metrics(90, 10, 0).health_status(), HealthStatus::Degraded);
        assert_eq!(metrics(40, 60, 2).health_status(), HealthStatus::Degraded);
        assert_eq!(metrics(40, 60, 0).health_status(), HealthStatus::Critical);
    }

    #[test]
    fn test_health_status_methods() {
        assert!(!HealthStatus::Healthy.is_unhealthy());
        assert!(HealthStatus::Degraded.is_unhealthy());
        assert!(HealthStatus::Critical.is_unhealthy());
        assert_eq!(HealthStatus::Critical.to_string(), "Critical");
    }

    #[test]
    fn test_summary() {
        let summary = metrics(7, 3, 1).summary();
        assert!(summary.contains("Allowed: 7"));
        assert!(summary.contains("Denied: 3"));
        assert!(summary.contains("Tokens: 1/10"));
        assert_eq!(format!("{}", metrics(7, 3, 1)), summary);
    }
}
