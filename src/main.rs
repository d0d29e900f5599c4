use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use distributed_cache::config::{GroupConfig, NodeConfig};
use distributed_cache::group::Groups;
use distributed_cache::routing::HttpPeers;
use distributed_cache::server::handlers;
use distributed_cache::server::Node;
use distributed_cache::ValueView;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} --addr <host:port> [--api <host:port>] [--etcd <endpoint>]... [--peer <host:port>]...", args[0]);
        eprintln!("Example: {} --addr 127.0.0.1:8001 --api 127.0.0.1:9999 --etcd http://127.0.0.1:2379", args[0]);
        eprintln!(
            "Example: {} --addr 127.0.0.1:8002 --peer 127.0.0.1:8001 --peer 127.0.0.1:8002",
            args[0]
        );
        std::process::exit(1);
    }

    let mut addr: Option<String> = None;
    let mut api_addr: Option<String> = None;
    let mut etcd_endpoints: Vec<String> = vec![];
    let mut static_peers: Vec<String> = vec![];

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" => {
                addr = Some(args[i + 1].clone());
                i += 2;
            }
            "--api" => {
                api_addr = Some(args[i + 1].clone());
                i += 2;
            }
            "--etcd" => {
                etcd_endpoints.push(args[i + 1].clone());
                i += 2;
            }
            "--peer" => {
                static_peers.push(args[i + 1].clone());
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let addr = addr.expect("--addr is required");

    let mut config = NodeConfig::from_env(&addr);
    config.api_addr = api_addr;
    if !etcd_endpoints.is_empty() {
        config.etcd_endpoints = etcd_endpoints;
    }

    info!("Starting cache node on {}", config.addr);
    if config.etcd_endpoints.is_empty() && static_peers.is_empty() {
        info!("No registry and no static peers; serving standalone");
    }

    // 1. Cache namespaces:
    let cache_bytes = std::env::var("CACHE_BYTES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(2 << 20);
    let hot_cache_bytes = std::env::var("HOT_CACHE_BYTES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(256 << 10);
    let empty_key_ttl_ms = std::env::var("EMPTY_KEY_TTL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(0);

    let groups = Arc::new(Groups::new());

    // Demo origin: a static score table standing in for a real backend.
    let db = Arc::new(HashMap::from([
        ("Tom", "630"),
        ("Jack", "589"),
        ("Sam", "567"),
    ]));

    let mut group_config = GroupConfig::new(cache_bytes).with_hot_cache(hot_cache_bytes);
    if empty_key_ttl_ms > 0 {
        group_config = group_config.with_empty_key_ttl(Duration::from_millis(empty_key_ttl_ms));
    }

    let group = groups.create("scores", group_config, move |key| {
        let db = db.clone();
        async move {
            info!("Loading {} from origin", key);
            match db.get(key.as_str()) {
                Some(value) => Ok(ValueView::new(value.as_bytes().to_vec())),
                None => Err(anyhow::anyhow!("{} does not exist in origin", key)),
            }
        }
    });

    // 2. Peer routing:
    let peers = HttpPeers::new(&config.addr, config.replicas, config.peer_fetch_timeout)?;
    group.register_peers(peers.clone())?;

    if !static_peers.is_empty() {
        info!("Using static peer set: {:?}", static_peers);
        peers.set_peers(&static_peers);
    }

    // 3. Peer endpoint + registry presence:
    let node = Node::start(&config, groups.clone(), peers.clone()).await?;

    // 4. Optional client-facing API server:
    if let Some(api_addr) = config.api_addr.clone() {
        let app = handlers::api_routes(groups.clone(), peers.clone());
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        info!("API server listening on {}", api_addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("API server error: {}", e);
            }
        });
    }

    info!("Press Ctrl+C to shutdown");
    shutdown_signal().await;

    node.shutdown().await;
    info!("Shutdown complete");

    Ok(())
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
