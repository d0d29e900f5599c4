//! Group Controller
//!
//! A `Group` is one cache namespace: it composes the main cache, an
//! optional hot cache for remote-owned keys, the peer router, the
//! single-flight coalescer, and the embedder's origin getter.
//!
//! ## Read path
//! 1. Probe the main cache, then the hot cache.
//! 2. On a miss, enter single-flight for the key.
//! 3. Inside the flight: if the router names a remote owner, fetch from
//!    it and admit the value to the hot cache; on any peer failure, fall
//!    through to the origin getter and admit to the main cache.
//!
//! Origin errors are either surfaced or, when negative caching is
//! enabled, absorbed as an empty value with a short expiry so bursts of
//! lookups for missing keys do not hammer the origin.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime};

use crate::cache::{SyncCache, ValueView};
use crate::config::GroupConfig;
use crate::error::{CacheError, Result};
use crate::group::singleflight::Flight;
use crate::routing::PeerPicker;

/// The origin-getter capability: the authoritative source consulted when
/// neither this node nor a peer holds the key.
pub type Source =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = anyhow::Result<ValueView>> + Send>> + Send + Sync>;

pub struct Group {
    name: String,
    source: Source,
    main_cache: SyncCache,
    hot_cache: Option<SyncCache>,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    flight: Flight,
    empty_key_ttl: Duration,
}

impl Group {
    pub(crate) fn new(name: &str, config: GroupConfig, source: Source) -> Self {
        Self {
            name: name.to_string(),
            source,
            main_cache: SyncCache::new(config.cache_bytes),
            hot_cache: if config.hot_cache_bytes > 0 {
                Some(SyncCache::new(config.hot_cache_bytes))
            } else {
                None
            },
            peers: OnceLock::new(),
            flight: Flight::new(),
            empty_key_ttl: config.empty_key_ttl,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installs the peer router. May be called at most once.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) -> Result<()> {
        self.peers
            .set(picker)
            .map_err(|_| CacheError::Internal("peer router already registered".to_string()))
    }

    /// Resolves `key` from the main cache, the hot cache, a remote peer,
    /// or the origin, in that order.
    pub async fn get(&self, key: &str) -> Result<ValueView> {
        if key.is_empty() {
            return Err(CacheError::BadRequest("key is required".to_string()));
        }

        if let Some(view) = self.main_cache.get(key).await {
            tracing::debug!("main cache hit for {}/{}", self.name, key);
            return Ok(view);
        }
        if let Some(hot) = &self.hot_cache {
            if let Some(view) = hot.get(key).await {
                tracing::debug!("hot cache hit for {}/{}", self.name, key);
                return Ok(view);
            }
        }

        self.flight.fly(key, || self.load(key)).await
    }

    /// Drops `key` from the main cache and, if configured, the hot cache.
    pub async fn remove(&self, key: &str) {
        self.main_cache.remove(key).await;
        if let Some(hot) = &self.hot_cache {
            hot.remove(key).await;
        }
    }

    pub async fn main_stats(&self) -> crate::cache::CacheStats {
        self.main_cache.stats().await
    }

    pub async fn hot_stats(&self) -> Option<crate::cache::CacheStats> {
        match &self.hot_cache {
            Some(hot) => Some(hot.stats().await),
            None => None,
        }
    }

    async fn load(&self, key: &str) -> Result<ValueView> {
        if let Some(picker) = self.peers.get() {
            if let Some(fetcher) = picker.pick(key) {
                match fetcher.fetch(&self.name, key).await {
                    Ok(view) => {
                        self.populate(key, &view, self.hot_cache.as_ref()).await;
                        return Ok(view);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "peer fetch failed for {}/{}, loading locally: {}",
                            self.name,
                            key,
                            e
                        );
                    }
                }
            }
        }

        self.load_locally(key).await
    }

    async fn load_locally(&self, key: &str) -> Result<ValueView> {
        match (self.source)(key.to_string()).await {
            Ok(view) => {
                self.populate(key, &view, Some(&self.main_cache)).await;
                Ok(view)
            }
            Err(e) if !self.empty_key_ttl.is_zero() => {
                tracing::debug!(
                    "origin failed for {}/{}, caching empty value: {}",
                    self.name,
                    key,
                    e
                );
                let view =
                    ValueView::with_expire(Vec::new(), SystemTime::now() + self.empty_key_ttl);
                self.populate(key, &view, Some(&self.main_cache)).await;
                Ok(view)
            }
            Err(e) => Err(CacheError::OriginFailure {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn populate(&self, key: &str, value: &ValueView, cache: Option<&SyncCache>) {
        if let Some(cache) = cache {
            cache.add(key, value.clone()).await;
        }
    }
}
