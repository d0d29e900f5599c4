//! HTTP Peer Router and Fetcher
//!
//! `HttpPeers` owns the ring and a client per known peer; it implements
//! `PeerPicker` with the self filter. `HttpFetcher` is the RPC client for
//! one peer: a GET against the peer endpoint with a bounded deadline and
//! one jittered retry.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use reqwest::Url;

use crate::cache::ValueView;
use crate::error::{CacheError, Result};
use crate::routing::{HashRing, PeerFetcher, PeerPicker};
use crate::server::protocol::{FetchResponse, BASE_PATH};

const FETCH_ATTEMPTS: usize = 2;

/// Peer router: ring owner and fetcher registry for one node.
pub struct HttpPeers {
    self_addr: String,
    replicas: usize,
    fetch_timeout: Duration,
    peers: Mutex<HashSet<String>>,
    ring: RwLock<Arc<HashRing>>,
    fetchers: DashMap<String, Arc<HttpFetcher>>,
    client: reqwest::Client,
}

impl HttpPeers {
    /// Creates a router for the node advertising `self_addr`. The address
    /// must be a valid `host:port`; a mis-set self address would defeat
    /// the self filter and allow fetch cycles.
    pub fn new(self_addr: &str, replicas: usize, fetch_timeout: Duration) -> Result<Arc<Self>> {
        self_addr
            .parse::<SocketAddr>()
            .map_err(|e| CacheError::Internal(format!("invalid self address {}: {}", self_addr, e)))?;

        Ok(Arc::new(Self {
            self_addr: self_addr.to_string(),
            replicas,
            fetch_timeout,
            peers: Mutex::new(HashSet::new()),
            ring: RwLock::new(Arc::new(HashRing::new(replicas, None))),
            fetchers: DashMap::new(),
            client: reqwest::Client::new(),
        }))
    }

    /// Replaces the whole peer set, typically from the initial registry
    /// enumeration.
    pub fn set_peers<S: AsRef<str>>(&self, addrs: &[S]) {
        let mut peers = self.peers.lock();
        peers.clear();
        for addr in addrs {
            peers.insert(addr.as_ref().to_string());
        }
        self.publish(&peers);
    }

    pub fn add_peer(&self, addr: &str) {
        let mut peers = self.peers.lock();
        if peers.insert(addr.to_string()) {
            tracing::info!("Peer joined: {}", addr);
            self.publish(&peers);
        }
    }

    pub fn remove_peer(&self, addr: &str) {
        let mut peers = self.peers.lock();
        if peers.remove(addr) {
            tracing::info!("Peer left: {}", addr);
            self.publish(&peers);
        }
    }

    pub fn peer_addrs(&self) -> Vec<String> {
        let peers = self.peers.lock();
        peers.iter().cloned().collect()
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    /// Rebuilds the ring from `peers` and swaps it in atomically, then
    /// reconciles the fetcher registry.
    fn publish(&self, peers: &HashSet<String>) {
        let addrs: Vec<&String> = peers.iter().collect();
        let mut ring = HashRing::new(self.replicas, None);
        ring.register(&addrs);
        *self.ring.write() = Arc::new(ring);

        self.fetchers.retain(|addr, _| peers.contains(addr));
        for addr in peers {
            if *addr != self.self_addr && !self.fetchers.contains_key(addr) {
                self.fetchers.insert(
                    addr.clone(),
                    Arc::new(HttpFetcher::new(
                        addr,
                        self.client.clone(),
                        self.fetch_timeout,
                    )),
                );
            }
        }
    }
}

impl PeerPicker for HttpPeers {
    fn pick(&self, key: &str) -> Option<Arc<dyn PeerFetcher>> {
        let ring = self.ring.read().clone();
        let addr = ring.pick(key)?;
        if addr == self.self_addr {
            return None;
        }
        let fetcher = self.fetchers.get(addr)?;
        tracing::debug!("Picked peer {} for key {}", addr, key);
        Some(fetcher.value().clone() as Arc<dyn PeerFetcher>)
    }
}

/// RPC client for a single remote peer.
pub struct HttpFetcher {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(addr: &str, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            base_url: format!("http://{}{}", addr, BASE_PATH),
            client,
            timeout,
        }
    }

    fn fetch_url(&self, group: &str, key: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| CacheError::Internal(format!("invalid peer url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| CacheError::Internal("invalid peer url".to_string()))?
            .pop_if_empty()
            .extend([group, key]);
        Ok(url)
    }

    async fn get_with_retry(&self, url: Url) -> Result<reqwest::Response> {
        let mut delay_ms = 100u64;

        for attempt in 0..FETCH_ATTEMPTS {
            let response = self
                .client
                .get(url.clone())
                .timeout(self.timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == FETCH_ATTEMPTS {
                        return Err(CacheError::PeerUnavailable(e.to_string()));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms *= 2;
                }
            }
        }

        Err(CacheError::PeerUnavailable(
            "retry attempts exhausted".to_string(),
        ))
    }
}

impl PeerFetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        group: &'a str,
        key: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<ValueView>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.fetch_url(group, key)?;
            let response = self.get_with_retry(url).await?;

            if !response.status().is_success() {
                return Err(CacheError::PeerUnavailable(format!(
                    "peer returned {}",
                    response.status()
                )));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| CacheError::PeerUnavailable(e.to_string()))?;
            let decoded: FetchResponse = bincode::deserialize(&body)
                .map_err(|e| CacheError::PeerUnavailable(format!("undecodable response: {}", e)))?;

            let view = ValueView::from_wire(decoded.value, decoded.expire_unix_nanos);
            if view.is_expired(SystemTime::now()) {
                return Err(CacheError::StaleFromPeer(key.to_string()));
            }
            Ok(view)
        })
    }
}
