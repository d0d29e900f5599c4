//! LRU Store
//!
//! A capacity-bounded, recency-ordered map with per-entry expiry. The
//! store itself is not thread-safe; `SyncCache` provides the locking.
//!
//! ## Mechanism
//! - **Recency**: every entry carries a monotonically increasing tick; a
//!   `BTreeMap<tick, key>` orders entries from least to most recently
//!   used. Promoting an entry re-stamps its tick.
//! - **Expiry**: entries with a non-zero expiry are indexed in a
//!   `BTreeSet<(expire_nanos, key)>`. `add` opportunistically sweeps up
//!   to [`EXPIRY_SWEEP_BATCH`] past-due entries before enforcing the
//!   byte capacity, and `get` removes an expired entry on contact.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::ValueView;

/// Max expired entries removed per `add`.
pub const EXPIRY_SWEEP_BATCH: usize = 10;

/// Called with the key and value of every entry the store evicts, whether
/// by capacity pressure or expiry. Explicit `remove` does not fire it.
pub type EvictionCallback = Box<dyn FnMut(&str, &ValueView) + Send>;

struct Entry {
    value: ValueView,
    size: usize,
    tick: u64,
}

/// Recency-ordered byte-bounded store.
pub struct LruStore {
    /// Capacity in bytes; 0 means unlimited.
    capacity: usize,
    /// Sum of entry sizes currently held.
    used: usize,
    /// Monotonic recency stamp. Largest tick is most recently used.
    tick: u64,
    entries: HashMap<String, Entry>,
    recency: BTreeMap<u64, String>,
    expiries: BTreeSet<(i64, String)>,
    on_evict: Option<EvictionCallback>,
}

impl LruStore {
    pub fn new(capacity: usize, on_evict: Option<EvictionCallback>) -> Self {
        Self {
            capacity,
            used: 0,
            tick: 0,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            expiries: BTreeSet::new(),
            on_evict,
        }
    }

    /// Looks up `key`, promoting it to most recently used on a hit. An
    /// entry whose expiry has passed is removed and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<ValueView> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.value.is_expired(SystemTime::now()),
            None => return None,
        };

        if expired {
            self.evict(key);
            return None;
        }

        self.touch(key);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Inserts or replaces `key`, then sweeps a bounded number of expired
    /// entries and enforces the byte capacity by evicting from the least
    /// recently used end.
    pub fn add(&mut self, key: &str, value: ValueView) {
        let size = key.len() + value.len();
        let expire_nanos = value.expire_unix_nanos();

        match self.entries.get_mut(key) {
            Some(entry) => {
                let old_expire = entry.value.expire_unix_nanos();
                if old_expire != 0 {
                    self.expiries.remove(&(old_expire, key.to_string()));
                }
                self.used = self.used - entry.size + size;
                entry.value = value;
                entry.size = size;
                self.touch(key);
            }
            None => {
                self.tick += 1;
                self.entries.insert(
                    key.to_string(),
                    Entry {
                        value,
                        size,
                        tick: self.tick,
                    },
                );
                self.recency.insert(self.tick, key.to_string());
                self.used += size;
            }
        }

        if expire_nanos != 0 {
            self.expiries.insert((expire_nanos, key.to_string()));
        }

        self.sweep_expired(EXPIRY_SWEEP_BATCH);
        while self.capacity > 0 && self.used > self.capacity {
            if !self.evict_oldest() {
                break;
            }
        }
    }

    /// Deletes `key` without firing the eviction callback.
    pub fn remove(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.recency.remove(&entry.tick);
            let expire_nanos = entry.value.expire_unix_nanos();
            if expire_nanos != 0 {
                self.expiries.remove(&(expire_nanos, key.to_string()));
            }
            self.used -= entry.size;
        }
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of entry sizes in bytes.
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    /// Re-stamps `key` as most recently used.
    fn touch(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.tick);
            self.tick += 1;
            entry.tick = self.tick;
            self.recency.insert(self.tick, key.to_string());
        }
    }

    /// Removes up to `limit` entries whose expiry is already past.
    fn sweep_expired(&mut self, limit: usize) {
        let now_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as i64;

        for _ in 0..limit {
            let key = match self.expiries.first() {
                Some((expire, key)) if *expire < now_nanos => key.clone(),
                _ => break,
            };
            self.evict(&key);
        }
    }

    /// Evicts the least recently used entry. Returns false when empty.
    fn evict_oldest(&mut self) -> bool {
        let key = match self.recency.first_key_value() {
            Some((_, key)) => key.clone(),
            None => return false,
        };
        self.evict(&key);
        true
    }

    /// Removes `key` and fires the eviction callback.
    fn evict(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.recency.remove(&entry.tick);
            let expire_nanos = entry.value.expire_unix_nanos();
            if expire_nanos != 0 {
                self.expiries.remove(&(expire_nanos, key.to_string()));
            }
            self.used -= entry.size;
            if let Some(on_evict) = self.on_evict.as_mut() {
                on_evict(key, &entry.value);
            }
        }
    }
}
