//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use mcp_gateway::config::{GatewayConfig, PendingPolicy};
use mcp_gateway::mcp::{Event, InMemoryEvents};
use mcp_gateway::{Gateway, HttpTransport, ServerManager};

/// Default config bound to an ephemeral loopback port.
pub fn local_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config
}

/// A bare server manager whose bridge is driven by the test itself.
#[allow(dead_code)]
pub async fn start_bridge_only(policy: PendingPolicy) -> (ServerManager, SocketAddr) {
    let manager = ServerManager::new(local_config(), HttpTransport::new(policy, None));
    let addr = manager.start().await.expect("bind loopback");
    (manager, addr)
}

/// A full gateway with dispatcher and the given events.
#[allow(dead_code)]
pub async fn start_gateway(events: Vec<Event>) -> (Gateway, SocketAddr) {
    let mut gateway = Gateway::new(local_config(), Arc::new(InMemoryEvents::new(events)));
    let addr = gateway.start().await.expect("bind loopback");
    (gateway, addr)
}

/// Write raw bytes, then read until the server closes the connection.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(request).await.expect("write request");
    read_until_closed(&mut stream).await
}

pub async fn read_until_closed(stream: &mut TcpStream) -> String {
    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
        .await
        .expect("server did not close the connection")
        .expect("read response");
    String::from_utf8(out).expect("utf-8 response")
}

/// Split a raw response into head and body at the blank line.
#[allow(dead_code)]
pub fn split_response(raw: &str) -> (&str, &str) {
    raw.split_once("\r\n\r\n").expect("response has a header terminator")
}

/// Poll until `check` holds or a second passes.
#[allow(dead_code)]
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
