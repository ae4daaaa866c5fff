//! A bounded-capacity, TTL-aware, single-flight cache parametric over key
//! and value. No background sweeper: expired entries are removed on
//! observation. See SPEC_FULL.md §4.1.

use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::watch;

/// A load error carried out of `get_or_load`. Loaders adapt their own error
/// type into this with `LoadError::new`; all joined callers see the same
/// message.
#[derive(Debug, Clone)]
pub struct LoadError(Arc<str>);

impl LoadError {
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for LoadError {}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Entry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
}

type Outcome<V> = Arc<Result<V, LoadError>>;

struct Inner<K: Hash + Eq, V> {
    lru: LruCache<K, Entry<V>>,
    inflight: HashMap<K, watch::Sender<Option<Outcome<V>>>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// LRU + TTL + single-flight cache. See module docs.
pub struct GenericCache<K: Hash + Eq + Clone, V: Clone> {
    capacity: NonZeroUsize,
    default_ttl: Duration,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> GenericCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            capacity,
            default_ttl,
            inner: Mutex::new(Inner {
                lru: LruCache::new(capacity),
                inflight: HashMap::new(),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_with_age(key).map(|(v, _)| v)
    }

    /// Returns the value plus the elapsed time since it was written.
    pub fn get_with_age(&self, key: &K) -> Option<(V, Duration)> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        match inner.lru.get(key) {
            Some(entry) if entry.expires_at > now => {
                let age = now.saturating_duration_since(entry.created_at);
                let value = entry.value.clone();
                inner.hits += 1;
                Some((value, age))
            }
            Some(_) => {
                inner.lru.pop(key);
                inner.misses += 1;
                None
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        let entry = Entry {
            value,
            created_at: now,
            expires_at: now + ttl,
        };
        let mut inner = self.inner.lock();
        let existed = inner.lru.contains(&key);
        let was_at_capacity = inner.lru.len() == self.capacity.get();
        inner.lru.put(key, entry);
        if !existed && was_at_capacity {
            inner.evictions += 1;
        }
    }

    /// Read-through with single-flight coalescing: on miss, if another
    /// caller is already loading `key`, wait on that load instead of
    /// calling `load_fn` again. The structural lock is released before
    /// `load_fn` runs.
    pub async fn get_or_load<F, Fut>(&self, key: K, load_fn: F) -> Result<V, LoadError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, LoadError>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        enum Role<V> {
            Loader,
            Joiner(watch::Receiver<Option<Outcome<V>>>),
        }

        let role = {
            let mut inner = self.inner.lock();
            if let Some(tx) = inner.inflight.get(&key) {
                Role::Joiner(tx.subscribe())
            } else {
                let (tx, _rx) = watch::channel(None);
                inner.inflight.insert(key.clone(), tx);
                Role::Loader
            }
        };

        match role {
            Role::Loader => {
                let result = load_fn().await;
                {
                    let mut inner = self.inner.lock();
                    if let Ok(value) = &result {
                        let now = Instant::now();
                        let entry = Entry {
                            value: value.clone(),
                            created_at: now,
                            expires_at: now + self.default_ttl,
                        };
                        let existed = inner.lru.contains(&key);
                        let was_at_capacity = inner.lru.len() == self.capacity.get();
                        inner.lru.put(key.clone(), entry);
                        if !existed && was_at_capacity {
                            inner.evictions += 1;
                        }
                    }
                    if let Some(tx) = inner.inflight.remove(&key) {
                        let _ = tx.send(Some(Arc::new(result.clone())));
                    }
                }
                result
            }
            Role::Joiner(mut rx) => loop {
                if let Some(outcome) = rx.borrow().clone() {
                    return (*outcome).clone();
                }
                if rx.changed().await.is_err() {
                    return Err(LoadError::new("cache loader dropped without completing"));
                }
            },
        }
    }

    pub fn invalidate(&self, key: &K) -> bool {
        self.inner.lock().lru.pop(key).is_some()
    }

    /// Evict every entry matching `predicate`. The predicate must be pure.
    pub fn invalidate_where(&self, predicate: impl Fn(&K) -> bool) -> usize {
        let mut inner = self.inner.lock();
        let keys: Vec<K> = inner.lru.iter().map(|(k, _)| k.clone()).filter(|k| predicate(k)).collect();
        for key in &keys {
            inner.lru.pop(key);
        }
        keys.len()
    }

    pub fn flush(&self) {
        self.inner.lock().lru.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            size: inner.lru.len(),
        }
    }

    pub fn reset_stats(&self) {
        let mut inner = self.inner.lock();
        inner.hits = 0;
        inner.misses = 0;
        inner.evictions = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lru_eviction_order() {
        let cache: GenericCache<&str, i32> = GenericCache::new(3, Duration::from_secs(60));
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        assert_eq!(cache.get(&"a"), Some(1));
        cache.set("d", 4);

        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"c"), Some(3));
        assert_eq!(cache.get(&"d"), Some(4));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn expired_entry_is_a_miss_and_is_removed() {
        let cache: GenericCache<&str, i32> = GenericCache::new(4, Duration::from_millis(1));
        cache.set("a", 1);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn set_then_get_within_ttl_roundtrips() {
        let cache: GenericCache<&str, i32> = GenericCache::new(4, Duration::from_secs(60));
        cache.set("a", 7);
        assert_eq!(cache.get(&"a"), Some(7));
    }

    #[test]
    fn invalidate_removes_single_key() {
        let cache: GenericCache<&str, i32> = GenericCache::new(4, Duration::from_secs(60));
        cache.set("a", 1);
        cache.set("b", 2);
        assert!(cache.invalidate(&"a"));
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
    }

    #[test]
    fn invalidate_where_removes_matching_keys() {
        let cache: GenericCache<&str, i32> = GenericCache::new(4, Duration::from_secs(60));
        cache.set("fs:a", 1);
        cache.set("fs:b", 2);
        cache.set("db:a", 3);
        let removed = cache.invalidate_where(|k| k.starts_with("fs:"));
        assert_eq!(removed, 2);
        assert_eq!(cache.get(&"db:a"), Some(3));
    }

    #[tokio::test]
    async fn single_flight_loader_runs_once_for_concurrent_joiners() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let cache: Arc<GenericCache<&str, i32>> = Arc::new(GenericCache::new(4, Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_load("k", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(99)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 99);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_or_load_error_propagates_to_all_joiners_and_is_not_cached() {
        let cache: Arc<GenericCache<&str, i32>> = Arc::new(GenericCache::new(4, Duration::from_secs(60)));

        let result = cache
            .get_or_load("k", || async { Err(LoadError::new("boom")) })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.get(&"k"), None);
    }

    #[test]
    fn reset_stats_zeroes_counters_but_keeps_entries() {
        let cache: GenericCache<&str, i32> = GenericCache::new(4, Duration::from_secs(60));
        cache.set("a", 1);
        cache.get(&"a");
        cache.get(&"missing");
        cache.reset_stats();
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.size, 1);
    }
}
