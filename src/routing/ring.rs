//! Consistent-Hash Ring
//!
//! Maps keys to peer addresses through virtual nodes so that membership
//! changes relocate only a small slice of the key space.
//!
//! Virtual node `i` of peer `p` hashes the string `{i}{p}`. The ring is
//! the sorted list of virtual hashes; lookups binary-search for the first
//! position at or after the key hash and wrap around. When two virtual
//! nodes collide on a hash, the mapping keeps the last registration;
//! selection stays deterministic for a fixed peer set.

pub type RingHashFn = Box<dyn Fn(&[u8]) -> u32 + Send + Sync>;

pub struct HashRing {
    replicas: usize,
    hash: RingHashFn,
    ring: Vec<u32>,
    peers_by_hash: std::collections::HashMap<u32, String>,
}

impl HashRing {
    /// Creates a ring with `replicas` virtual nodes per peer. The default
    /// hash is CRC32-IEEE.
    pub fn new(replicas: usize, hash: Option<RingHashFn>) -> Self {
        Self {
            replicas: replicas.max(1),
            hash: hash.unwrap_or_else(|| Box::new(crc32fast::hash)),
            ring: Vec::new(),
            peers_by_hash: std::collections::HashMap::new(),
        }
    }

    /// Places each peer on the ring at `replicas` virtual positions.
    pub fn register<S: AsRef<str>>(&mut self, peers: &[S]) {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let virtual_key = format!("{}{}", i, peer);
                let hash = (self.hash)(virtual_key.as_bytes());
                self.ring.push(hash);
                self.peers_by_hash.insert(hash, peer.to_string());
            }
        }
        self.ring.sort_unstable();
    }

    /// Removes each peer's virtual nodes and rebuilds the ring from the
    /// surviving mapping.
    pub fn remove<S: AsRef<str>>(&mut self, peers: &[S]) {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let virtual_key = format!("{}{}", i, peer);
                let hash = (self.hash)(virtual_key.as_bytes());
                self.peers_by_hash.remove(&hash);
            }
        }
        self.ring = self.peers_by_hash.keys().copied().collect();
        self.ring.sort_unstable();
    }

    /// Returns the address owning `key`, or `None` on an empty ring.
    pub fn pick(&self, key: &str) -> Option<&str> {
        if self.ring.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let idx = self.ring.partition_point(|&h| h < hash) % self.ring.len();
        self.peers_by_hash
            .get(&self.ring[idx])
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Number of virtual nodes currently on the ring.
    pub fn len(&self) -> usize {
        self.ring.len()
    }
}
