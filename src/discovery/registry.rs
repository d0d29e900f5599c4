//! etcd Registry Adaptor
//!
//! Publishes this node's address under a TTL lease and turns the prefix
//! watch into a stream of peer membership events.
//!
//! ## Protocol
//! 1. Grant a lease (default 10 s TTL).
//! 2. Put `<prefix><addr> -> <addr>` bound to the lease.
//! 3. Keep the lease alive from a background task; the response stream
//!    must be drained for the renewals to count.
//! 4. Enumerate the prefix for the initial peer set.
//! 5. Watch the prefix; puts become `Join`, deletes become `Leave`. A
//!    delete no longer carries the value, so the address is recovered
//!    from the key suffix.

use std::time::Duration;

use anyhow::Result;
use etcd_client::{Client, EventType, GetOptions, PutOptions, WatchOptions};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const EVENT_CHANNEL_SIZE: usize = 16;

/// A peer membership change observed through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    Join(String),
    Leave(String),
}

pub struct Registry {
    client: Client,
    prefix: String,
    lease_ttl: i64,
    lease_id: Option<i64>,
    keepalive: Option<JoinHandle<()>>,
}

impl Registry {
    pub async fn connect(endpoints: &[String], prefix: &str, lease_ttl: i64) -> Result<Self> {
        let client = Client::connect(endpoints, None).await?;
        Ok(Self {
            client,
            prefix: prefix.to_string(),
            lease_ttl,
            lease_id: None,
            keepalive: None,
        })
    }

    /// Writes `prefix + addr -> addr` under a fresh lease and starts the
    /// keep-alive task.
    pub async fn register(&mut self, addr: &str) -> Result<()> {
        let lease = self.client.lease_grant(self.lease_ttl, None).await?;
        let key = format!("{}{}", self.prefix, addr);
        self.client
            .put(key, addr, Some(PutOptions::new().with_lease(lease.id())))
            .await?;

        let (mut keeper, mut responses) = self.client.lease_keep_alive(lease.id()).await?;
        let interval_secs = (self.lease_ttl / 3).max(1) as u64;
        let lease_id = lease.id();
        let keepalive = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                if let Err(e) = keeper.keep_alive().await {
                    tracing::warn!("Lease {} keep-alive send failed: {}", lease_id, e);
                    break;
                }
                match responses.message().await {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        tracing::warn!("Lease {} keep-alive stream closed", lease_id);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Lease {} keep-alive recv failed: {}", lease_id, e);
                        break;
                    }
                }
            }
        });

        self.lease_id = Some(lease_id);
        self.keepalive = Some(keepalive);
        tracing::info!("Registered {} with lease {} ({}s TTL)", addr, lease_id, self.lease_ttl);
        Ok(())
    }

    /// Enumerates every address currently registered under the prefix.
    pub async fn peer_addrs(&mut self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.prefix.clone(), Some(GetOptions::new().with_prefix()))
            .await?;

        let mut addrs = Vec::with_capacity(response.kvs().len());
        for kv in response.kvs() {
            addrs.push(kv.value_str()?.to_string());
        }
        Ok(addrs)
    }

    /// Opens a prefix watch and translates it into `PeerEvent`s.
    pub async fn watch_peers(&mut self) -> Result<mpsc::Receiver<PeerEvent>> {
        let (watcher, mut stream) = self
            .client
            .watch(self.prefix.clone(), Some(WatchOptions::new().with_prefix()))
            .await?;

        let prefix = self.prefix.clone();
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        tokio::spawn(async move {
            // The watcher handle must stay alive for the stream to run.
            let _watcher = watcher;
            loop {
                match stream.message().await {
                    Ok(Some(response)) => {
                        for event in response.events() {
                            let Some(kv) = event.kv() else { continue };
                            let (key, value) = match (kv.key_str(), kv.value_str()) {
                                (Ok(key), Ok(value)) => (key, value),
                                _ => continue,
                            };
                            if let Some(peer_event) =
                                peer_event(&prefix, event.event_type(), key, value)
                            {
                                if tx.send(peer_event).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    Ok(None) => {
                        tracing::warn!("Registry watch stream closed");
                        return;
                    }
                    Err(e) => {
                        tracing::warn!("Registry watch failed: {}", e);
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    /// Revokes the lease and stops the keep-alive task. The registration
    /// key disappears with the lease.
    pub async fn deregister(&mut self) {
        if let Some(keepalive) = self.keepalive.take() {
            keepalive.abort();
        }
        if let Some(lease_id) = self.lease_id.take() {
            if let Err(e) = self.client.lease_revoke(lease_id).await {
                tracing::warn!("Failed to revoke lease {}: {}", lease_id, e);
            }
        }
    }
}

/// Translates one watch event. Delete events carry no value, so the
/// address is derived from the key suffix.
fn peer_event(prefix: &str, event_type: EventType, key: &str, value: &str) -> Option<PeerEvent> {
    match event_type {
        EventType::Put => {
            if value.is_empty() {
                return None;
            }
            Some(PeerEvent::Join(value.to_string()))
        }
        EventType::Delete => key
            .strip_prefix(prefix)
            .filter(|suffix| !suffix.is_empty())
            .map(|suffix| PeerEvent::Leave(suffix.to_string())),
    }
}
