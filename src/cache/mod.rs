//! In-memory TTL cache with lazy expiry.
//!
//! Entries expire a fixed duration after insertion. Expiry is checked on
//! read: a [`TtlCache::get`] that finds an expired entry deletes it and
//! reports a miss. There is no background sweeper and no size bound, so keys
//! that are never read again stay resident until [`TtlCache::clear`] or
//! [`TtlCache::clear_by_prefix`] removes them.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// Default time-to-live for cached values.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Longest lifetime any entry or session gets; longer TTLs are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// The instant `ttl` from `now`, with `ttl` clamped to [`MAX_TTL`] so the
/// addition cannot overflow.
pub(crate) fn expiry(now: Instant, ttl: Duration) -> Instant {
    now + ttl.min(MAX_TTL)
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A string-keyed cache whose entries lazily expire.
///
/// All operations take `&self`; the map is guarded by a mutex that is never
/// held across an `.await`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use demo_api::cache::TtlCache;
///
/// let cache = TtlCache::new();
/// cache.set("rnd:a", 1, Duration::from_secs(60));
/// assert_eq!(cache.get("rnd:a"), Some(1));
/// assert_eq!(cache.len(), 1);
/// ```
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a clone of the value under `key` if it has not expired.
    ///
    /// An expired entry is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries();
        let entry = entries.get(key)?;
        if Instant::now() > entry.expires_at {
            entries.remove(key);
            trace!(key, "cache entry expired");
            return None;
        }
        Some(entry.value.clone())
    }

    /// Stores `value` under `key`, replacing any previous entry, expiring
    /// `ttl` from now.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: expiry(Instant::now(), ttl),
        };
        self.entries().insert(key.into(), entry);
    }

    /// Removes every entry whose key starts with `prefix` and returns how
    /// many were removed.
    pub fn clear_by_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn set_then_get() {
        let cache = TtlCache::new();
        cache.set("rnd:x", "v".to_string(), DEFAULT_TTL);
        assert_eq!(cache.get("rnd:x").as_deref(), Some("v"));
        assert_eq!(cache.get("rnd:y"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_get_removes_entry() {
        let cache = TtlCache::new();
        cache.set("rnd:x", 1, Duration::from_millis(100));
        cache.set("rnd:y", 2, Duration::from_secs(10));
        assert_eq!(cache.len(), 2);

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(cache.get("rnd:x"), Some(1));

        tokio::time::advance(Duration::from_millis(51)).await;
        assert_eq!(cache.get("rnd:x"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("rnd:y"), Some(2));
    }

    #[tokio::test]
    async fn huge_ttl_is_clamped_instead_of_overflowing() {
        let cache = TtlCache::new();
        cache.set("k", 1, Duration::from_secs(u64::MAX));
        assert_eq!(cache.get("k"), Some(1));

        let now = Instant::now();
        assert_eq!(expiry(now, Duration::MAX), now + MAX_TTL);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_is_lazy() {
        let cache = TtlCache::new();
        cache.set("k", 1, Duration::from_millis(10));
        tokio::time::advance(Duration::from_secs(1)).await;

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_overwrites_and_extends() {
        let cache = TtlCache::new();
        cache.set("k", 1, Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(5)).await;
        cache.set("k", 2, Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(8)).await;

        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_by_prefix_and_clear() {
        let cache = TtlCache::new();
        cache.set("rnd:a", 1, DEFAULT_TTL);
        cache.set("rnd:b", 2, DEFAULT_TTL);
        cache.set("other", 3, DEFAULT_TTL);

        assert_eq!(cache.clear_by_prefix("rnd:"), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("other"), Some(3));

        cache.clear();
        assert!(cache.is_empty());
    }
}
