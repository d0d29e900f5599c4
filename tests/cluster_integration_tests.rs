//! Cluster Integration Tests
//!
//! Boots real peer endpoints on ephemeral ports and exercises the full
//! remote fetch path over HTTP: routing, the wire codec, hot-cache
//! admission, and fall-through when a peer is unreachable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use distributed_cache::config::GroupConfig;
use distributed_cache::group::Groups;
use distributed_cache::routing::{HttpPeers, PeerPicker};
use distributed_cache::server::handlers::peer_routes;
use distributed_cache::server::protocol::{FetchResponse, BASE_PATH};
use distributed_cache::ValueView;

// == Helper Functions ==

/// Binds a peer endpoint for `groups` on an ephemeral port and returns
/// its address.
async fn spawn_peer_server(groups: Arc<Groups>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let app = peer_routes(groups);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A node with one "scores" group whose origin tags values with `tag`
/// and counts its invocations.
fn scores_node(tag: &'static str, counter: Arc<AtomicUsize>) -> Arc<Groups> {
    let groups = Arc::new(Groups::new());
    groups.create(
        "scores",
        GroupConfig::new(64 << 10).with_hot_cache(64 << 10),
        move |key| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(ValueView::new(format!("{}-{}", tag, key).into_bytes()))
            }
        },
    );
    groups
}

/// Finds a key that node A's picker routes to its (single) remote peer.
fn remote_owned_key(peers: &HttpPeers) -> String {
    (0..1000)
        .map(|i| format!("user-{}", i))
        .find(|key| peers.pick(key).is_some())
        .expect("some key must be owned by the remote peer")
}

// == Remote Fetch Tests ==

#[tokio::test]
async fn test_remote_owned_key_is_fetched_from_peer_once() {
    let origin_a = Arc::new(AtomicUsize::new(0));
    let origin_b = Arc::new(AtomicUsize::new(0));

    let groups_a = scores_node("a", origin_a.clone());
    let groups_b = scores_node("b", origin_b.clone());

    let addr_a = spawn_peer_server(groups_a.clone()).await;
    let addr_b = spawn_peer_server(groups_b.clone()).await;

    let peers_a = HttpPeers::new(&addr_a, 50, Duration::from_secs(2)).unwrap();
    peers_a.set_peers(&[addr_a.clone(), addr_b.clone()]);

    let group_a = groups_a.get("scores").unwrap();
    group_a.register_peers(peers_a.clone()).unwrap();

    let key = remote_owned_key(&peers_a);

    let got = group_a.get(&key).await.unwrap();
    assert_eq!(got.to_vec(), format!("b-{}", key).into_bytes());
    assert_eq!(origin_b.load(Ordering::SeqCst), 1);
    assert_eq!(origin_a.load(Ordering::SeqCst), 0);

    // The peer-fetched value is admitted to the hot cache only.
    assert_eq!(group_a.hot_stats().await.unwrap().entries, 1);
    assert_eq!(group_a.main_stats().await.entries, 0);

    // A repeat read is served from the hot cache without another fetch.
    let again = group_a.get(&key).await.unwrap();
    assert_eq!(again.to_vec(), format!("b-{}", key).into_bytes());
    assert_eq!(origin_b.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_peer_endpoint_speaks_the_wire_codec() {
    let origin_b = Arc::new(AtomicUsize::new(0));
    let groups_b = scores_node("b", origin_b.clone());
    let addr_b = spawn_peer_server(groups_b).await;

    let response = reqwest::get(format!("http://{}{}scores/Tom", addr_b, BASE_PATH))
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/octet-stream")
    );

    let body = response.bytes().await.unwrap();
    let decoded: FetchResponse = bincode::deserialize(&body).unwrap();
    assert_eq!(decoded.value, b"b-Tom".to_vec());
    assert_eq!(decoded.expire_unix_nanos, 0);
}

#[tokio::test]
async fn test_peer_endpoint_unknown_group_is_404() {
    let groups = Arc::new(Groups::new());
    let addr = spawn_peer_server(groups).await;

    let response = reqwest::get(format!("http://{}{}missing/key", addr, BASE_PATH))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unreachable_peer_falls_through_to_local_origin() {
    let origin_a = Arc::new(AtomicUsize::new(0));
    let groups_a = scores_node("a", origin_a.clone());
    let addr_a = spawn_peer_server(groups_a.clone()).await;

    // Reserve a port, then free it so every fetch to it is refused.
    let dead_addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    };

    let peers_a = HttpPeers::new(&addr_a, 50, Duration::from_millis(500)).unwrap();
    peers_a.set_peers(&[addr_a.clone(), dead_addr]);

    let group_a = groups_a.get("scores").unwrap();
    group_a.register_peers(peers_a.clone()).unwrap();

    let key = remote_owned_key(&peers_a);

    let got = group_a.get(&key).await.unwrap();
    assert_eq!(got.to_vec(), format!("a-{}", key).into_bytes());
    assert_eq!(origin_a.load(Ordering::SeqCst), 1);

    // Fall-through populates the main cache, not the hot cache.
    assert_eq!(group_a.main_stats().await.entries, 1);
    assert_eq!(group_a.hot_stats().await.unwrap().entries, 0);
}
