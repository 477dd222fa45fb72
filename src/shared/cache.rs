//! # Concurrent Cache
//!
//! A string-keyed map behind one reader/writer lock. Reads share the lock,
//! writes take it exclusively, and the insert-if-missing operations perform
//! their check and their insert under a single write guard:
//!
//! ```text
//!     get / has / size / keys ──► read lock  ──┐
//!                                              ├──► HashMap<String, V>
//!     set / delete / clear ─────► write lock ──┤
//!     get_or_set / get_or_compute ► write lock ┘   (check + insert, atomic)
//! ```
//!
//! There is no per-key locking. One lock for all entries keeps the
//! check-and-insert trivially atomic at the cost of serializing writers.

use ahash::RandomState;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;

/// Thread-safe string-keyed cache.
///
/// Values are returned by clone, so a cache of large values usually stores
/// them behind an `Arc`.
///
/// ```rust
/// use pacekit::ConcurrentCache;
///
/// let cache = ConcurrentCache::new();
/// assert_eq!(cache.get_or_set("k", "v1"), ("v1", false));
/// assert_eq!(cache.get_or_set("k", "v2"), ("v1", true));
/// ```
pub struct ConcurrentCache<V> {
    entries: RwLock<HashMap<String, V, RandomState>>,
}

impl<V: Clone> ConcurrentCache<V> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty cache with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity_and_hasher(
                capacity,
                RandomState::new(),
            )),
        }
    }

    /// Inserts or overwrites the value for `key`.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.entries.write().insert(key.into(), value);
    }

    /// Returns a clone of the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    /// Removes `key`. Does nothing if it is absent.
    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Removes `key` and returns its value, if it was present.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.write().remove(key)
    }

    /// Returns `true` if `key` is present.
    pub fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Drops every entry at once.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        *entries = HashMap::with_hasher(RandomState::new());
    }

    /// Number of entries at the moment of the call.
    pub fn size(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if the cache held no entries at the moment of the call.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Keys present at the moment of the call, in no particular order.
    ///
    /// Concurrent writers may change the cache as soon as this returns.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Copies every entry out under one read lock.
    pub fn snapshot(&self) -> HashMap<String, V> {
        self.entries
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Returns the existing value for `key`, or inserts `value`.
    ///
    /// The flag is `true` when the value already existed (and `value` was
    /// dropped), `false` when `value` was just inserted.
    pub fn get_or_set(&self, key: impl Into<String>, value: V) -> (V, bool) {
        let key = key.into();
        let mut entries = self.entries.write();

        if let Some(existing) = entries.get(&key) {
            return (existing.clone(), true);
        }

        entries.insert(key, value.clone());
        (value, false)
    }

    /// Returns the existing value for `key`, or inserts the one `compute`
    /// produces.
    ///
    /// `compute` runs at most once per missing key, even when many threads
    /// race on the same key, because it is called while the write lock is
    /// held. Every other cache operation waits for it, so it must be quick
    /// and must not touch this cache.
    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(existing) = self.entries.read().get(key) {
            return existing.clone();
        }

        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(key) {
            return existing.clone();
        }

        let value = compute();
        entries.insert(key.to_owned(), value.clone());
        value
    }
}

impl<V: Clone> Default for ConcurrentCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for ConcurrentCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentCache")
            .field("size", &self.entries.read().len())
            .finish()
    }
}
