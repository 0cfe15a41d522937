//! Shared utilities for lifecycle integration tests.

#![allow(dead_code)]

use axum::routing::get;
use axum::Router;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use server_lifecycle::cleanup::ResourceCleaner;
use server_lifecycle::config::ServerConfig;
use server_lifecycle::http::{HttpServer, ServerHandle};

/// Loopback config on an ephemeral port.
pub fn loopback_config() -> ServerConfig {
    ServerConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        ..ServerConfig::default()
    }
}

/// Router whose `/slow` handler sleeps for `delay` before answering.
pub fn slow_router(delay: Duration) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/slow",
            get(move || async move {
                tokio::time::sleep(delay).await;
                "done"
            }),
        )
}

/// Start `router` on an ephemeral loopback port.
pub async fn start_server(router: Router) -> ServerHandle {
    let config = loopback_config();
    HttpServer::new(router, &config)
        .start(config.bind_address())
        .await
        .expect("server should bind")
}

/// Register a cleanup action that increments the returned counter.
pub fn register_counter(cleaner: &ResourceCleaner, name: &str) -> Arc<AtomicUsize> {
    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    cleaner
        .register_with_name(name, move || async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok::<(), std::io::Error>(())
        })
        .expect("registry should be open");
    counter
}

/// Fire a GET at `path` in the background and wait until the server reports
/// it as in flight.
pub async fn start_in_flight_request(handle: &ServerHandle, path: &str) {
    let url = format!("http://{}{}", handle.local_addr(), path);
    tokio::spawn(async move {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let _ = client.get(url).send().await;
    });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while handle.in_flight() == 0 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "request never reached the handler"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
