use std::collections::HashMap;
use std::time::Duration;

use crate::routing::{HashRing, HttpPeers, PeerPicker, RingHashFn};

/// Hash that parses the bytes as a decimal number, which makes ring
/// placement easy to reason about in tests.
fn numeric_hash() -> RingHashFn {
    Box::new(|data| {
        std::str::from_utf8(data)
            .expect("test keys are utf-8")
            .parse()
            .expect("test keys are numeric")
    })
}

// ============================================================
// HASH RING TESTS
// ============================================================

#[test]
fn test_ring_empty_pick_is_none() {
    let ring = HashRing::new(3, None);
    assert!(ring.pick("anything").is_none());
    assert!(ring.is_empty());
}

#[test]
fn test_ring_placement_with_numeric_hash() {
    // Peers 2/4/6 with 3 replicas land on 2,12,22 / 4,14,24 / 6,16,26.
    let mut ring = HashRing::new(3, Some(numeric_hash()));
    ring.register(&["6", "4", "2"]);
    assert_eq!(ring.len(), 9);

    assert_eq!(ring.pick("2"), Some("2"));
    assert_eq!(ring.pick("11"), Some("2"));
    assert_eq!(ring.pick("23"), Some("4"));
    assert_eq!(ring.pick("27"), Some("2"));

    // Adding peer 8 (8,18,28) captures key 27.
    ring.register(&["8"]);
    assert_eq!(ring.pick("27"), Some("8"));
}

#[test]
fn test_ring_pick_is_deterministic() {
    let mut ring = HashRing::new(50, None);
    ring.register(&["10.0.0.1:8001", "10.0.0.2:8001", "10.0.0.3:8001"]);

    let first = ring.pick("some-key").map(str::to_string);
    for _ in 0..100 {
        assert_eq!(ring.pick("some-key").map(str::to_string), first);
    }

    // An independently built ring over the same peers agrees.
    let mut other = HashRing::new(50, None);
    other.register(&["10.0.0.3:8001", "10.0.0.1:8001", "10.0.0.2:8001"]);
    assert_eq!(other.pick("some-key").map(str::to_string), first);
}

#[test]
fn test_ring_register_then_remove_is_empty() {
    let peers = ["a:1", "b:2", "c:3"];
    let mut ring = HashRing::new(7, None);
    ring.register(&peers);
    assert_eq!(ring.len(), 21);

    ring.remove(&peers);
    assert!(ring.is_empty());
    assert!(ring.pick("key").is_none());
}

#[test]
fn test_ring_removed_peer_is_never_picked() {
    let mut ring = HashRing::new(50, None);
    ring.register(&["a:1", "b:2", "c:3"]);
    ring.remove(&["b:2"]);

    for i in 0..500 {
        let owner = ring.pick(&format!("key-{}", i)).expect("ring not empty");
        assert_ne!(owner, "b:2");
    }
}

#[test]
fn test_ring_relocation_is_bounded_on_join() {
    let peers: Vec<String> = (1..=5).map(|i| format!("10.0.0.{}:8001", i)).collect();
    let mut ring = HashRing::new(50, None);
    ring.register(&peers);

    let mut owners = HashMap::new();
    for i in 0..1000 {
        let key = format!("key-{}", i);
        owners.insert(key.clone(), ring.pick(&key).map(str::to_string));
    }

    ring.register(&["10.0.0.6:8001"]);

    let moved = owners
        .iter()
        .filter(|(key, owner)| ring.pick(key).map(str::to_string) != **owner)
        .count();

    // Expectation with a sixth peer is ~1/6 of the key space. Leave
    // generous slack for hash variance.
    assert!(moved > 0, "a join must relocate some keys");
    assert!(moved < 350, "join relocated {} of 1000 keys", moved);
}

// ============================================================
// PEER ROUTER TESTS
// ============================================================

#[tokio::test]
async fn test_peers_rejects_invalid_self_addr() {
    assert!(HttpPeers::new("not-an-addr", 3, Duration::from_secs(1)).is_err());
}

#[tokio::test]
async fn test_peers_self_only_ring_picks_nobody() {
    let peers = HttpPeers::new("127.0.0.1:9001", 50, Duration::from_secs(1)).unwrap();
    peers.set_peers(&["127.0.0.1:9001"]);

    for i in 0..200 {
        assert!(peers.pick(&format!("key-{}", i)).is_none());
    }
}

#[tokio::test]
async fn test_peers_pick_reaches_remote_peer() {
    let peers = HttpPeers::new("127.0.0.1:9001", 50, Duration::from_secs(1)).unwrap();
    peers.set_peers(&["127.0.0.1:9001", "127.0.0.1:9002"]);

    let picked = (0..200)
        .filter(|i| peers.pick(&format!("key-{}", i)).is_some())
        .count();
    assert!(picked > 0, "some keys must be owned by the remote peer");
    assert!(picked < 200, "the self filter must keep some keys local");
}

#[tokio::test]
async fn test_peers_membership_updates_apply() {
    let peers = HttpPeers::new("127.0.0.1:9001", 50, Duration::from_secs(1)).unwrap();
    peers.set_peers(&["127.0.0.1:9001"]);
    assert_eq!(peers.peer_addrs().len(), 1);

    peers.add_peer("127.0.0.1:9002");
    assert_eq!(peers.peer_addrs().len(), 2);

    peers.remove_peer("127.0.0.1:9002");
    assert_eq!(peers.peer_addrs().len(), 1);
    for i in 0..200 {
        assert!(peers.pick(&format!("key-{}", i)).is_none());
    }
}
