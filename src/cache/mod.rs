//! Cache Storage Module
//!
//! The per-node storage layer: immutable value views, a recency-ordered
//! byte-bounded LRU with expiry, and the mutex wrapper that makes one LRU
//! safe to share across tasks.
//!
//! ## Core Concepts
//! - **Views**: callers receive `ValueView` handles that copy on read, so
//!   eviction never invalidates a value a caller already holds.
//! - **Strict LRU**: `get` and `add` both promote; eviction takes the
//!   opposite end. Expired entries are removed ahead of age-based
//!   eviction.
//! - **Separation**: `LruStore` owns the algorithm, `SyncCache` owns the
//!   locking. Swapping the algorithm never touches callers.

pub mod concurrent;
pub mod lru;
pub mod value;

pub use concurrent::{CacheStats, SyncCache};
pub use lru::{EvictionCallback, LruStore, EXPIRY_SWEEP_BATCH};
pub use value::ValueView;
