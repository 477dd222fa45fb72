//! # Keyed Rate Limiting
//!
//! One independent [`RateLimiter`] per key, created on first use. Typical
//! keys are client addresses, user ids or tenant names.
//!
//! ```text
//!     "alice" ──┐
//!     "bob" ────┼──► KeyedRateLimiter ──► DashMap<K, Arc<RateLimiter>>
//!     "carol" ──┘          │                 ┌──────────────┐
//!                          │                 │ alice → RL   │
//!                          ▼                 │ bob   → RL   │
//!                  cleanup(idle) drops       │ carol → RL   │
//!                  limiters nobody used      └──────────────┘
//!                  within `idle`
//! ```
//!
//! The map is sharded, so checks for different keys rarely contend. Each
//! limiter keeps its own lock; a keyed check never blocks on another key's
//! bucket.

use super::{config::RateLimiterConfig, core::RateLimiter};
use crate::cancel::CancellationToken;
use crate::error::Result;
use ahash::RandomState;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// A family of rate limiters sharing one configuration, one per key.
///
/// ```rust
/// use pacekit::{KeyedRateLimiter, RateLimiterConfig};
///
/// let limiters = KeyedRateLimiter::new(RateLimiterConfig::per_second(2));
///
/// assert!(limiters.allow(&"alice"));
/// assert!(limiters.allow(&"alice"));
/// assert!(!limiters.allow(&"alice"));
///
/// // Other keys have their own bucket
/// assert!(limiters.allow(&"bob"));
/// ```
pub struct KeyedRateLimiter<K>
where
    K: Eq + Hash,
{
    limiters: DashMap<K, Arc<RateLimiter>, RandomState>,
    config: RateLimiterConfig,
    total_created: AtomicU64,
    total_removed: AtomicU64,
}

impl<K> KeyedRateLimiter<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty family; every key gets a limiter built from `config`.
    pub fn new(config: RateLimiterConfig) -> Self {
        // More shards = less contention, capped to bound the memory overhead
        let shards = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8)
            .saturating_mul(4)
            .next_power_of_two()
            .clamp(4, 64);

        Self {
            limiters: DashMap::with_hasher_and_shard_amount(RandomState::new(), shards),
            config: config.normalized(),
            total_created: AtomicU64::new(0),
            total_removed: AtomicU64::new(0),
        }
    }

    /// Returns the limiter for `key`, creating it on first use.
    pub fn limiter(&self, key: &K) -> Arc<RateLimiter> {
        // Fast path: shared shard lock only
        if let Some(limiter) = self.limiters.get(key) {
            return Arc::clone(limiter.value());
        }

        self.limiters
            .entry(key.clone())
            .or_insert_with(|| {
                let created = self.total_created.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Created keyed rate limiter (total created: {})", created);
                Arc::new(RateLimiter::with_config(self.config))
            })
            .value()
            .clone()
    }

    /// Non-blocking admission check for `key`.
    ///
    /// The check runs while the key's shard is read-locked, so
    /// [`cleanup`](Self::cleanup) can never evict a limiter between lookup
    /// and admission.
    pub fn allow(&self, key: &K) -> bool {
        if let Some(limiter) = self.limiters.get(key) {
            return limiter.allow();
        }

        let limiter = self.limiters.entry(key.clone()).or_insert_with(|| {
            let created = self.total_created.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("Created keyed rate limiter (total created: {})", created);
            Arc::new(RateLimiter::with_config(self.config))
        });
        limiter.allow()
    }

    /// Blocking admission for `key`; see [`RateLimiter::wait`].
    ///
    /// The map is only locked for each admission check, never while sleeping.
    pub fn wait(&self, key: &K, token: &CancellationToken) -> Result<()> {
        let spacing = self.config.token_spacing();
        loop {
            token.check()?;
            if self.allow(key) {
                return Ok(());
            }
            token.sleep(spacing)?;
        }
    }

    /// Whether a limiter for `key` currently exists.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.limiters.contains_key(key)
    }

    /// Forgets the limiter for `key`. Returns `true` if there was one.
    pub fn remove(&self, key: &K) -> bool {
        let removed = self.limiters.remove(key).is_some();
        if removed {
            self.total_removed.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Drops every limiter that saw no admission check within `idle`.
    ///
    /// Returns the number removed. A key that comes back later starts again
    /// with a full bucket. Checks made through [`allow`](Self::allow) and
    /// [`wait`](Self::wait) are never lost to eviction; a limiter handed out
    /// by [`limiter`](Self::limiter) is detached once evicted.
    pub fn cleanup(&self, idle: Duration) -> usize {
        let mut removed = 0;
        self.limiters.retain(|_, limiter| {
            let keep = !limiter.is_idle(idle);
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            self.total_removed
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!("Keyed cleanup removed {} idle limiters", removed);
        }
        removed
    }

    /// Removes every limiter.
    pub fn clear(&self) {
        let count = self.limiters.len();
        self.limiters.clear();
        self.total_removed.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Number of keys currently tracked.
    #[inline]
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// Returns `true` when no key is tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// The configuration every per-key limiter is built from.
    #[inline]
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Lifetime statistics.
    pub fn stats(&self) -> KeyedStats {
        KeyedStats {
            active_keys: self.len(),
            total_created: self.total_created.load(Ordering::Relaxed),
            total_removed: self.total_removed.load(Ordering::Relaxed),
        }
    }
}

impl<K> KeyedRateLimiter<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Spawns a background thread calling [`cleanup`](Self::cleanup) every
    /// `every`, removing limiters idle for longer than `idle`.
    ///
    /// The thread runs until the returned handle is stopped or dropped.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn_cleanup(
        self: Arc<Self>,
        every: Duration,
        idle: Duration,
    ) -> io::Result<CleanupHandle> {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("pacekit-cleanup".to_string())
            .spawn(move || {
                info!("Started keyed limiter cleanup (every {:?}, idle {:?})", every, idle);
                loop {
                    match stop_rx.recv_timeout(every) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {
                            self.cleanup(idle);
                        }
                    }
                }
                info!("Keyed limiter cleanup stopped");
            })?;

        Ok(CleanupHandle {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }
}

impl<K> fmt::Debug for KeyedRateLimiter<K>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedRateLimiter")
            .field("active_keys", &self.limiters.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Handle to a background cleanup thread. Stops the thread when dropped.
#[derive(Debug)]
pub struct CleanupHandle {
    stop_tx: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CleanupHandle {
    /// Signals the thread to stop and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel and wakes the thread
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CleanupHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Lifetime statistics of a [`KeyedRateLimiter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedStats {
    /// Keys currently tracked.
    pub active_keys: usize,

    /// Limiters created since construction.
    pub total_created: u64,

    /// Limiters removed by `remove`, `cleanup` or `clear`.
    pub total_removed: u64,
}

impl fmt::Display for KeyedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Keyed Rate Limiter Stats:\n\
             ├─ Active Keys: {}\n\
             ├─ Total Created: {}\n\
             └─ Total Removed: {}",
            self.active_keys, self.total_created, self.total_removed
        )
    }
}
