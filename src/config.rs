//! Configuration Module
//!
//! Node-level settings come from environment variables with sensible
//! defaults; per-group settings are built explicitly by the embedder.

use std::env;
use std::time::Duration;

/// Virtual nodes per peer on the hash ring.
pub const DEFAULT_RING_REPLICAS: usize = 50;
/// Per-attempt deadline for a remote peer fetch.
pub const DEFAULT_PEER_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Registry lease TTL in seconds.
pub const DEFAULT_LEASE_TTL_SECS: i64 = 10;
/// Registry key prefix under which nodes publish their address.
pub const DEFAULT_REGISTRY_PREFIX: &str = "/cache/nodes/";

/// Node-level configuration.
///
/// `addr` is the address this node advertises to peers; it must match
/// what other nodes can reach over HTTP.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Advertised address (`host:port`) of the peer endpoint.
    pub addr: String,
    /// Optional address for the client-facing API server.
    pub api_addr: Option<String>,
    /// etcd endpoints; empty disables registry-based discovery.
    pub etcd_endpoints: Vec<String>,
    /// Registry key prefix.
    pub registry_prefix: String,
    /// Virtual nodes per peer on the ring.
    pub replicas: usize,
    /// Per-attempt deadline for remote peer fetches.
    pub peer_fetch_timeout: Duration,
    /// Registry lease TTL in seconds.
    pub lease_ttl: i64,
}

impl NodeConfig {
    /// Builds a config for `addr`, reading the remaining knobs from the
    /// environment.
    ///
    /// # Environment Variables
    /// - `ETCD_ENDPOINTS` - comma-separated etcd endpoints (default: none)
    /// - `REGISTRY_PREFIX` - registry key prefix (default: `/cache/nodes/`)
    /// - `RING_REPLICAS` - virtual nodes per peer (default: 50)
    /// - `PEER_FETCH_TIMEOUT_MS` - remote fetch deadline (default: 10000)
    /// - `LEASE_TTL_SECS` - registry lease TTL (default: 10)
    pub fn from_env(addr: &str) -> Self {
        let etcd_endpoints = env::var("ETCD_ENDPOINTS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            addr: addr.to_string(),
            api_addr: None,
            etcd_endpoints,
            registry_prefix: env::var("REGISTRY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_REGISTRY_PREFIX.to_string()),
            replicas: env::var("RING_REPLICAS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RING_REPLICAS),
            peer_fetch_timeout: env::var("PEER_FETCH_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_PEER_FETCH_TIMEOUT),
            lease_ttl: env::var("LEASE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_LEASE_TTL_SECS),
        }
    }
}

/// Per-group cache sizing and behavior.
///
/// Main and hot caches are sized independently; neither derives its
/// capacity from the other.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Main-cache capacity in bytes. 0 means unlimited.
    pub cache_bytes: usize,
    /// Hot-cache capacity in bytes. 0 disables the hot cache.
    pub hot_cache_bytes: usize,
    /// Negative-cache TTL for origin errors. Zero disables it.
    pub empty_key_ttl: Duration,
}

impl GroupConfig {
    pub fn new(cache_bytes: usize) -> Self {
        Self {
            cache_bytes,
            hot_cache_bytes: 0,
            empty_key_ttl: Duration::ZERO,
        }
    }

    /// Enables a hot cache for remote-owned keys.
    pub fn with_hot_cache(mut self, bytes: usize) -> Self {
        self.hot_cache_bytes = bytes;
        self
    }

    /// Enables negative caching of origin errors.
    pub fn with_empty_key_ttl(mut self, ttl: Duration) -> Self {
        self.empty_key_ttl = ttl;
        self
    }
}
