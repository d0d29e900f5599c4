//! Discovery Module
//!
//! Node presence and peer discovery through an external lease-aware KV
//! registry (etcd). Each node writes its address under a shared prefix,
//! keeps the lease alive while healthy, and watches the prefix to learn
//! about peers joining and leaving. Losing the registry degrades
//! discovery only: the cache keeps serving with the last known peer set.

pub mod registry;

pub use registry::{PeerEvent, Registry};
