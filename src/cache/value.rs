//! Immutable Value Views
//!
//! Cached payloads are handed to callers as `ValueView`s. The view owns a
//! shared, immutable buffer; the public accessor returns a copy, so the
//! bytes held by the cache can never be modified from outside, and a view
//! held by a caller stays valid after the entry is evicted.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// An immutable view over a cached byte payload with an optional absolute
/// expiry instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueView {
    bytes: Arc<[u8]>,
    expire: Option<SystemTime>,
}

impl ValueView {
    /// Wraps `bytes` with no expiry.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
            expire: None,
        }
    }

    /// Wraps `bytes` with an absolute expiry instant.
    pub fn with_expire(bytes: impl Into<Vec<u8>>, expire: SystemTime) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
            expire: Some(expire),
        }
    }

    /// Rebuilds a view from its wire form, where zero nanoseconds means
    /// "no expiry".
    pub fn from_wire(bytes: Vec<u8>, expire_unix_nanos: i64) -> Self {
        let expire = if expire_unix_nanos == 0 {
            None
        } else {
            Some(UNIX_EPOCH + Duration::from_nanos(expire_unix_nanos.max(0) as u64))
        };
        Self {
            bytes: Arc::from(bytes),
            expire,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn expire(&self) -> Option<SystemTime> {
        self.expire
    }

    /// Expiry as nanoseconds since the epoch; 0 means "no expiry".
    pub fn expire_unix_nanos(&self) -> i64 {
        match self.expire {
            Some(at) => at
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as i64)
                .unwrap_or(0),
            None => 0,
        }
    }

    /// True when the expiry instant lies strictly before `now`.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        match self.expire {
            Some(at) => at < now,
            None => false,
        }
    }

    /// Returns a fresh copy of the payload.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl fmt::Display for ValueView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}
