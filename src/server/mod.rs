//! Server Module
//!
//! The peer-facing HTTP endpoint, the wire protocol it speaks, and the
//! node lifecycle handle that ties the endpoint to registry presence.
//!
//! ## Lifecycle
//! `Node::start` binds the peer endpoint, registers the node's address in
//! the discovery registry under a lease, seeds the ring with the current
//! peer set, and keeps the ring in sync from watch events.
//! `Node::shutdown` stops the endpoint gracefully and revokes the lease
//! so peers drop this node promptly instead of waiting out the TTL.
//! Registry trouble is never fatal: the node keeps serving with the last
//! known peer set and falls through to local origin loads.

pub mod handlers;
pub mod protocol;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::NodeConfig;
use crate::discovery::{PeerEvent, Registry};
use crate::group::Groups;
use crate::routing::HttpPeers;

/// A running cache node: the peer endpoint plus registry presence.
pub struct Node {
    addr: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    registry: Option<Registry>,
}

impl Node {
    /// Binds the peer endpoint on `config.addr` and joins the registry
    /// when etcd endpoints are configured.
    pub async fn start(
        config: &NodeConfig,
        groups: Arc<Groups>,
        peers: Arc<HttpPeers>,
    ) -> Result<Node> {
        let listener = tokio::net::TcpListener::bind(&config.addr).await?;
        tracing::info!("Peer endpoint listening on {}", config.addr);

        let app = handlers::peer_routes(groups);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                tracing::error!("Peer endpoint error: {}", e);
            }
        });

        let registry = if config.etcd_endpoints.is_empty() {
            None
        } else {
            match Self::join_registry(config, peers).await {
                Ok(registry) => Some(registry),
                Err(e) => {
                    tracing::warn!("Registry unavailable, keeping static peer set: {}", e);
                    None
                }
            }
        };

        Ok(Node {
            addr: config.addr.clone(),
            shutdown: Some(shutdown_tx),
            task,
            registry,
        })
    }

    /// Publishes this node, seeds the ring from the current registry
    /// contents, and spawns the watch consumer that keeps it current.
    async fn join_registry(config: &NodeConfig, peers: Arc<HttpPeers>) -> Result<Registry> {
        let mut registry = Registry::connect(
            &config.etcd_endpoints,
            &config.registry_prefix,
            config.lease_ttl,
        )
        .await?;

        registry.register(&config.addr).await?;

        let addrs = registry.peer_addrs().await?;
        tracing::info!("Discovered {} registered node(s)", addrs.len());
        peers.set_peers(&addrs);

        let mut events = registry.watch_peers().await?;
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    PeerEvent::Join(addr) => peers.add_peer(&addr),
                    PeerEvent::Leave(addr) => peers.remove_peer(&addr),
                }
            }
            tracing::warn!("Registry watch ended; keeping last known peer set");
        });

        Ok(registry)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Stops the endpoint and releases the registry lease.
    pub async fn shutdown(mut self) {
        if let Some(registry) = self.registry.as_mut() {
            registry.deregister().await;
        }
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            tracing::warn!("Peer endpoint task failed: {}", e);
        }
        tracing::info!("Node {} shut down", self.addr);
    }
}
