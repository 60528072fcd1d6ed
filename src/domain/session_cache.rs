//! TTL cache keyed by a caller-chosen session scope.

use moka::sync::Cache;
use std::time::Duration;

pub const DEFAULT_TTL_SECS: u64 = 300;
pub const DEFAULT_MAX_SCOPES: u64 = 1_024;

/// Values are shared by everyone asking under the same scope until the TTL
/// expires. Internally synchronized; clones share the same storage.
#[derive(Clone)]
pub struct SessionCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<String, V>,
    ttl: Duration,
}

impl<V> SessionCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration, max_scopes: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_scopes)
            .time_to_live(ttl)
            .build();
        Self { inner, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, scope: &str) -> Option<V> {
        self.inner.get(scope)
    }

    pub fn insert(&self, scope: &str, value: V) {
        self.inner.insert(scope.to_string(), value);
    }

    /// Returns the cached value for `scope`, computing it with `init` on a
    /// miss. Concurrent misses on one scope run `init` once.
    pub fn get_or_insert_with(&self, scope: &str, init: impl FnOnce() -> V) -> V {
        self.inner.get_with(scope.to_string(), init)
    }

    pub fn invalidate(&self, scope: &str) {
        self.inner.invalidate(scope);
    }
}

impl<V> Default for SessionCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECS), DEFAULT_MAX_SCOPES)
    }
}

impl<V> std::fmt::Debug for SessionCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache").field("ttl", &self.ttl).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn miss_then_hit() {
        let cache: SessionCache<u32> = SessionCache::default();
        assert!(cache.get("s1").is_none());
        cache.insert("s1", 7);
        assert_eq!(cache.get("s1"), Some(7));
        assert!(cache.get("s2").is_none());
    }

    #[test]
    fn init_runs_once_per_scope() {
        let cache: SessionCache<String> = SessionCache::default();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            "tape".to_string()
        };
        assert_eq!(cache.get_or_insert_with("user", compute), "tape");
        assert_eq!(cache.get_or_insert_with("user", compute), "tape");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        cache.get_or_insert_with("other", compute);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache: SessionCache<u32> = SessionCache::new(Duration::from_millis(50), 16);
        cache.insert("s", 1);
        std::thread::sleep(Duration::from_millis(120));
        assert!(cache.get("s").is_none());
    }

    #[test]
    fn invalidate_drops_scope() {
        let cache: SessionCache<u32> = SessionCache::default();
        cache.insert("s", 1);
        cache.invalidate("s");
        assert!(cache.get("s").is_none());
    }
}
