//! Node HTTP Handlers
//!
//! Two surfaces share these handlers: the peer endpoint that other nodes
//! fetch from, and the optional client-facing API server with its stats
//! route. Both resolve groups through an Extension-injected `Groups`
//! table.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sysinfo::System;

use crate::cache::CacheStats;
use crate::error::CacheError;
use crate::group::Groups;
use crate::routing::HttpPeers;
use crate::server::protocol::{FetchResponse, BASE_PATH};

/// Router for the peer-facing endpoint.
pub fn peer_routes(groups: Arc<Groups>) -> Router {
    Router::new()
        .route(&format!("{}:group/:key", BASE_PATH), get(handle_peer_fetch))
        .fallback(handle_bad_path)
        .layer(Extension(groups))
}

/// Peer requests must name exactly `<prefix><group>/<key>`.
async fn handle_bad_path() -> Response {
    CacheError::BadRequest("malformed request path".to_string()).into_response()
}

/// Router for the client-facing API server.
pub fn api_routes(groups: Arc<Groups>, peers: Arc<HttpPeers>) -> Router {
    Router::new()
        .route("/api/:group/:key", get(handle_api_get))
        .route("/health/stats", get(handle_stats))
        .layer(Extension(groups))
        .layer(Extension(peers))
}

/// Serves one `(group, key)` fetch for a remote peer.
///
/// The response body is the bincode-encoded [`FetchResponse`]; the
/// absolute expiry rides along so the caller can reject stale payloads.
async fn handle_peer_fetch(
    Extension(groups): Extension<Arc<Groups>>,
    Path((group_name, key)): Path<(String, String)>,
) -> Response {
    let Some(group) = groups.get(&group_name) else {
        return CacheError::GroupUnknown(group_name).into_response();
    };

    match group.get(&key).await {
        Ok(view) => {
            let body = FetchResponse {
                value: view.to_vec(),
                expire_unix_nanos: view.expire_unix_nanos(),
            };
            match bincode::serialize(&body) {
                Ok(bytes) => (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "application/octet-stream")],
                    bytes,
                )
                    .into_response(),
                Err(e) => {
                    tracing::error!("Failed to encode fetch response: {}", e);
                    CacheError::Internal(e.to_string()).into_response()
                }
            }
        }
        Err(e) => e.into_response(),
    }
}

/// Client-facing read: returns the raw payload bytes.
async fn handle_api_get(
    Extension(groups): Extension<Arc<Groups>>,
    Path((group_name, key)): Path<(String, String)>,
) -> Response {
    let Some(group) = groups.get(&group_name) else {
        return CacheError::GroupUnknown(group_name).into_response();
    };

    match group.get(&key).await {
        Ok(view) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            view.to_vec(),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Serialize)]
struct GroupStatsResponse {
    name: String,
    main: CacheStats,
    hot: Option<CacheStats>,
}

#[derive(Serialize)]
struct NodeStatsResponse {
    addr: String,
    peers: Vec<String>,
    groups: Vec<GroupStatsResponse>,
    cpu_usage: f32,
    mem_used_mb: u64,
    mem_total_mb: u64,
}

async fn handle_stats(
    Extension(groups): Extension<Arc<Groups>>,
    Extension(peers): Extension<Arc<HttpPeers>>,
) -> Json<NodeStatsResponse> {
    let mut group_stats = Vec::new();
    for name in groups.names() {
        if let Some(group) = groups.get(&name) {
            group_stats.push(GroupStatsResponse {
                name,
                main: group.main_stats().await,
                hot: group.hot_stats().await,
            });
        }
    }

    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    // sysinfo returns bytes for memory values.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(NodeStatsResponse {
        addr: peers.self_addr().to_string(),
        peers: peers.peer_addrs(),
        groups: group_stats,
        cpu_usage: sys.global_cpu_info().cpu_usage(),
        mem_used_mb,
        mem_total_mb,
    })
}
