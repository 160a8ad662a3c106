//! Accept loop and per-connection handling.
//!
//! # Responsibilities
//! - Accept connections until shutdown is signalled
//! - Spawn one task per connection so the accept loop never waits on a peer
//! - Read once, parse, route, then respond or hand off to the bridge
//! - Only `/mcp` keeps reading, and only until a declared `Content-Length` has arrived
//!
//! # Design Decisions
//! - Network errors are logged and the connection dropped; they never stop the loop
//! - Shutdown stops accepting and releases the socket; in-flight tasks finish on their own

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::config::GatewayConfig;
use crate::http::response::Response;
use crate::mcp::HttpTransport;
use crate::net::request_line::awaiting_body;
use crate::net::{parse_request, Connection, ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;
use crate::routing::{Route, RouteTable};

/// Everything a connection task needs. Shared by all tasks.
struct ConnectionHandler {
    routes: RouteTable,
    bridge: HttpTransport,
    receive_buffer_bytes: usize,
    read_timeout: Option<Duration>,
}

impl ConnectionHandler {
    async fn serve(&self, mut connection: Connection) {
        let start = Instant::now();
        let id = connection.id();

        let mut raw = match self.read(&mut connection).await {
            Some(raw) => raw,
            None => {
                connection.close().await;
                return;
            }
        };

        // Canned routes answer from the first read; only the bridge waits for a declared body.
        let first = self.routes.resolve_request(&parse_request(&raw));
        if first == Route::ControlProtocol
            && awaiting_body(&raw)
            && !self.read_body(&mut connection, &mut raw).await
        {
            connection.close().await;
            return;
        }

        let parsed = parse_request(&raw);
        let route = self.routes.resolve_request(&parsed);
        match &parsed {
            Ok(request) => tracing::debug!(
                connection_id = %id,
                peer_addr = ?connection.peer_addr(),
                method = request.method,
                path = request.path,
                bytes = raw.len(),
                route = route.as_str(),
                "Request received"
            ),
            Err(e) => tracing::debug!(connection_id = %id, error = %e, "Unparseable request"),
        }

        match route {
            Route::Liveness => Self::respond(connection, Response::healthy()).await,
            Route::NotFound => Self::respond(connection, Response::not_found()).await,
            Route::ControlProtocol => self.bridge.handle(connection, &raw).await,
        }
        metrics::record_request(route.as_str(), start);
    }

    /// Rest of a declared `/mcp` body. `false` means the connection should just be closed.
    async fn read_body(&self, connection: &mut Connection, raw: &mut Vec<u8>) -> bool {
        let id = connection.id();
        let cap = self.receive_buffer_bytes;
        let result = match self.read_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, connection.read_declared_body(raw, cap)).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(connection_id = %id, timeout = ?limit, "Body read timed out");
                        return false;
                    }
                }
            }
            None => connection.read_declared_body(raw, cap).await,
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "Error receiving body");
                false
            }
        }
    }

    /// One read up to the buffer cap. `None` means the connection should just be closed.
    async fn read(&self, connection: &mut Connection) -> Option<Vec<u8>> {
        let id = connection.id();
        let cap = self.receive_buffer_bytes;
        let result = match self.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, connection.read_request(cap)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(connection_id = %id, timeout = ?limit, "Read timed out");
                    return None;
                }
            },
            None => connection.read_request(cap).await,
        };

        match result {
            Ok(raw) if raw.is_empty() => {
                tracing::debug!(connection_id = %id, "Peer closed before sending a request");
                None
            }
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "Error receiving data");
                None
            }
        }
    }

    async fn respond(connection: Connection, response: Response<'_>) {
        let id = connection.id();
        if let Err(e) = connection.respond_and_close(&response.to_bytes()).await {
            tracing::warn!(connection_id = %id, error = %e, "Error sending response");
        }
    }
}

/// HTTP front-end serving the liveness and control-protocol endpoints.
pub struct HttpServer {
    handler: Arc<ConnectionHandler>,
    tracker: ConnectionTracker,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &GatewayConfig, bridge: HttpTransport) -> Self {
        Self {
            handler: Arc::new(ConnectionHandler {
                routes: RouteTable::from_config(&config.routes),
                bridge,
                receive_buffer_bytes: config.listener.receive_buffer_bytes,
                read_timeout: config.timeouts.read_secs.map(Duration::from_secs),
            }),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Live connection counter shared with every connection this server accepts.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept connections until `shutdown` fires, then release the socket.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "HTTP server started");
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr, permit)) => {
                        let connection = Connection::new(stream, Some(peer_addr), self.tracker.track());
                        let handler = Arc::clone(&self.handler);
                        tokio::spawn(async move {
                            let _permit = permit;
                            handler.serve(connection).await;
                        });
                    }
                    Err(ListenerError::LimiterClosed) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        drop(listener);
        tracing::info!(
            in_flight = self.tracker.active_count(),
            "HTTP server stopped"
        );
    }
}
