//! Distributed Cache Cluster Library
//!
//! This library crate defines the core modules of a peer-to-peer,
//! read-through in-memory cache. Clients may ask any node for a
//! `(group, key)` pair; consistent hashing routes the lookup to the
//! owning peer, and a miss there is filled from the embedder's origin
//! getter exactly once per key, no matter how many callers are waiting.
//!
//! ## Architecture Modules
//! The system is composed of five loosely coupled subsystems:
//!
//! - **`cache`**: The storage layer. Immutable value views, a
//!   byte-bounded LRU with per-entry expiry, and the mutex wrapper that
//!   shares one LRU across tasks.
//! - **`group`**: The namespace layer. Each group composes a main cache,
//!   an optional hot cache for remote-owned keys, a single-flight
//!   coalescer, and the origin getter; a table resolves group names for
//!   the server endpoints.
//! - **`routing`**: The peer router. A consistent-hash ring with virtual
//!   nodes maps keys to peer addresses; an HTTP fetcher retrieves values
//!   from the owning node.
//! - **`server`**: The HTTP surface. The peer-facing fetch endpoint, the
//!   optional client API, and the node lifecycle handle.
//! - **`discovery`**: Cluster membership through an external lease-aware
//!   KV registry (etcd): publish self, watch the prefix, feed the ring.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod group;
pub mod routing;
pub mod server;

pub use cache::ValueView;
pub use config::{GroupConfig, NodeConfig};
pub use error::{CacheError, Result};
