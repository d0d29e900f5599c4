use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use crate::cache::ValueView;
use crate::config::GroupConfig;
use crate::group::Groups;
use crate::routing::HttpPeers;
use crate::server::handlers::{api_routes, peer_routes};
use crate::server::protocol::{FetchResponse, BASE_PATH};

fn demo_groups() -> Arc<Groups> {
    let groups = Arc::new(Groups::new());
    groups.create("scores", GroupConfig::new(1024), |key| async move {
        match key.as_str() {
            "Tom" => Ok(ValueView::new(b"630".to_vec())),
            _ => Err(anyhow::anyhow!("{} does not exist", key)),
        }
    });
    groups
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec()
}

// ============================================================
// PEER ENDPOINT TESTS
// ============================================================

#[tokio::test]
async fn test_peer_fetch_returns_encoded_view() {
    let app = peer_routes(demo_groups());

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("{}scores/Tom", BASE_PATH))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/octet-stream")
    );

    let body = body_bytes(response.into_body()).await;
    let decoded: FetchResponse = bincode::deserialize(&body).unwrap();
    assert_eq!(decoded.value, b"630".to_vec());
    assert_eq!(decoded.expire_unix_nanos, 0);
}

#[tokio::test]
async fn test_peer_fetch_unknown_group_is_404() {
    let app = peer_routes(demo_groups());

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("{}missing/Tom", BASE_PATH))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_peer_fetch_malformed_path_is_400() {
    let app = peer_routes(demo_groups());

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("{}scores", BASE_PATH))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_peer_fetch_origin_failure_is_500() {
    let app = peer_routes(demo_groups());

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("{}scores/Nobody", BASE_PATH))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================
// API SERVER TESTS
// ============================================================

#[tokio::test]
async fn test_api_get_returns_raw_bytes() {
    let groups = demo_groups();
    let peers = HttpPeers::new("127.0.0.1:9701", 3, Duration::from_secs(1)).unwrap();
    let app = api_routes(groups, peers);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/scores/Tom")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"630".to_vec());
}

#[tokio::test]
async fn test_api_stats_reports_groups_and_self() {
    let groups = demo_groups();
    let peers = HttpPeers::new("127.0.0.1:9702", 3, Duration::from_secs(1)).unwrap();
    let app = api_routes(groups.clone(), peers);

    // Warm the cache so the stats carry a hit.
    groups.get("scores").unwrap().get("Tom").await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response.into_body()).await;
    let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats["addr"], "127.0.0.1:9702");
    assert_eq!(stats["groups"][0]["name"], "scores");
    assert_eq!(stats["groups"][0]["main"]["entries"], 1);
}
