//! Peer Routing Module
//!
//! Decides which node owns a key and talks to it.
//!
//! ## Core Concepts
//! - **Consistent hashing**: each peer is placed on a sorted ring at
//!   `replicas` virtual positions; a key is owned by the first virtual
//!   node at or after its hash, wrapping around.
//! - **Snapshot swap**: membership changes rebuild the ring and publish
//!   the new one atomically, so the pick path never takes a write lock.
//! - **Self filter**: a pick that lands on this node's own address is
//!   reported as "no peer", which sends the load down the local path and
//!   prevents fetch cycles.

pub mod peers;
pub mod ring;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::cache::ValueView;
use crate::error::Result;

pub use peers::{HttpFetcher, HttpPeers};
pub use ring::{HashRing, RingHashFn};

/// RPC client to one remote node's cache.
pub trait PeerFetcher: Send + Sync {
    /// Fetches `(group, key)` from the remote peer.
    fn fetch<'a>(
        &'a self,
        group: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ValueView>> + Send + 'a>>;
}

/// Selects the peer that owns a key, or `None` when the key should be
/// served locally.
pub trait PeerPicker: Send + Sync {
    fn pick(&self, key: &str) -> Option<Arc<dyn PeerFetcher>>;
}

#[cfg(test)]
mod tests;
