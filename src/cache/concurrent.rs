//! Concurrent Cache Wrapper
//!
//! Serializes access to one `LruStore` behind a mutex. The store is built
//! lazily on the first `add`; a read against an empty wrapper is a miss
//! and does not allocate anything.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::cache::{LruStore, ValueView};

/// Point-in-time counters for one cache.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub used_bytes: usize,
}

/// Mutex-guarded LRU with lazy initialization.
pub struct SyncCache {
    capacity: usize,
    inner: Mutex<Option<LruStore>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SyncCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, key: &str) -> Option<ValueView> {
        let mut inner = self.inner.lock().await;
        let value = inner.as_mut().and_then(|lru| lru.get(key));
        match value {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        value
    }

    pub async fn add(&self, key: &str, value: ValueView) {
        let mut inner = self.inner.lock().await;
        inner
            .get_or_insert_with(|| LruStore::new(self.capacity, None))
            .add(key, value);
    }

    pub async fn remove(&self, key: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(lru) = inner.as_mut() {
            lru.remove(key);
        }
    }

    pub async fn len(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.as_ref().map(|lru| lru.len()).unwrap_or(0)
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        let (entries, used_bytes) = inner
            .as_ref()
            .map(|lru| (lru.len(), lru.used_bytes()))
            .unwrap_or((0, 0));

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
            used_bytes,
        }
    }
}
