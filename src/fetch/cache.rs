// src/fetch/cache.rs
//! Memoizing map shared by the workers of a batch.
//!
//! The cache is an ordinary value: whoever builds the batch owns it and
//! decides how long it lives (one run, or passed along to later runs).

use dashmap::DashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Hit and miss counters of a [`RequestCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hit(s), {} miss(es)", self.hits, self.misses)
    }
}

/// Thread-safe memoizing map from a lookup key to its result.
///
/// Each key owns a cell that is initialized at most once. Concurrent first
/// lookups of the same key wait on that cell instead of computing again, so
/// every caller observes the same value.
pub struct RequestCache<K, V> {
    entries: DashMap<K, Arc<OnceCell<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> RequestCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached value for `key`, computing and storing it first if
    /// needed. `compute` runs at most once per key.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = self.cell_for(&key);
        if let Some(value) = cell.get() {
            self.record_hit(&key);
            return value.clone();
        }

        let mut computed = false;
        let value = cell
            .get_or_init(|| {
                computed = true;
                compute()
            })
            .await;

        if computed {
            self.record_miss(&key);
        } else {
            self.record_hit(&key);
        }
        value.clone()
    }

    /// Like [`get_or_compute`](Self::get_or_compute) for a fallible
    /// computation. Errors are returned to the caller and not cached, so the
    /// next lookup of the key computes again.
    pub async fn get_or_try_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = self.cell_for(&key);
        if let Some(value) = cell.get() {
            self.record_hit(&key);
            return Ok(value.clone());
        }

        let mut computed = false;
        let result = cell
            .get_or_try_init(|| {
                computed = true;
                compute()
            })
            .await;

        match result {
            Ok(value) => {
                if computed {
                    self.record_miss(&key);
                } else {
                    self.record_hit(&key);
                }
                Ok(value.clone())
            }
            Err(error) => {
                log::debug!("Cache compute failed for {:?}, not caching", key);
                Err(error)
            }
        }
    }

    /// The cached value for `key`, if one has been computed.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .and_then(|cell| cell.value().get().cloned())
    }

    /// Number of keys holding a computed value.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn cell_for(&self, key: &K) -> Arc<OnceCell<V>> {
        // Clone the Arc out so no map guard is held across an await.
        if let Some(cell) = self.entries.get(key) {
            return Arc::clone(cell.value());
        }
        Arc::clone(
            self.entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        )
    }

    fn record_hit(&self, key: &K) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        log::debug!("Cache hit: {:?}", key);
    }

    fn record_miss(&self, key: &K) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!("Cache miss: {:?}", key);
    }
}

impl<K, V> Default for RequestCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> fmt::Debug for RequestCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCache")
            .field("keys", &self.entries.len())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}
