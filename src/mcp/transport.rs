//! HTTP-to-message transport bridge.
//!
//! The control-protocol dispatcher expects a persistent stream of inbound
//! payloads and a sink for replies. Over HTTP each request arrives on its own
//! connection, so the bridge parks every `/mcp` connection as a *pending
//! recipient* until the dispatcher answers it, then writes exactly one HTTP
//! response and closes the connection.
//!
//! ```text
//! handle(conn, raw) ──▶ pending[conn-N] ──┐
//!        │                                │
//!        └──▶ inbound channel ──▶ dispatcher ──▶ reply(conn-N, payload)
//!                                                 └──▶ 200 + payload, close
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use crate::config::{BridgeConfig, PendingPolicy, TimeoutConfig};
use crate::http::response::Response;
use crate::net::request_line::split_body;
use crate::net::{Connection, ConnectionId, ConnectionState};
use crate::observability::metrics;

/// One control-protocol payload extracted from an HTTP body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Connection waiting for the reply to this message.
    pub connection_id: ConnectionId,
    pub payload: Vec<u8>,
}

/// Single-consumer end of the inbound sequence.
pub type InboundReceiver = mpsc::UnboundedReceiver<InboundMessage>;

/// Errors reported to the bridge's caller. Never sent to a network peer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no active connection to send data")]
    NoPendingConnection,
    #[error("{0} is not awaiting a reply")]
    UnknownConnection(ConnectionId),
    #[error("error sending MCP response on {id}: {source}")]
    Write {
        id: ConnectionId,
        #[source]
        source: std::io::Error,
    },
}

/// Message-sequence transport as seen by the dispatcher.
pub trait Transport: Send + Sync {
    /// Prepare the transport. Connections are managed by the listener, so this may be a no-op.
    fn connect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// End the inbound sequence and release anything still waiting.
    fn disconnect(&self) -> impl Future<Output = ()> + Send;

    /// Deliver a payload to the next pending recipient.
    fn send(&self, payload: Vec<u8>) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Deliver a payload to the recipient of a specific inbound message.
    fn reply(
        &self,
        to: ConnectionId,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let _ = to;
        self.send(payload)
    }

    /// Take the inbound sequence. Only the first caller receives it.
    fn receive(&self) -> impl Future<Output = Option<InboundReceiver>> + Send;
}

struct BridgeState {
    /// `None` once disconnected.
    inbound_tx: Option<mpsc::UnboundedSender<InboundMessage>>,
    /// Oldest first.
    pending: VecDeque<Connection>,
}

impl BridgeState {
    fn take_pending(&mut self, id: ConnectionId) -> Option<Connection> {
        let index = self.pending.iter().position(|c| c.id() == id)?;
        self.pending.remove(index)
    }
}

struct Inner {
    policy: PendingPolicy,
    reply_timeout: Option<Duration>,
    state: Mutex<BridgeState>,
    inbound_rx: Mutex<Option<InboundReceiver>>,
}

/// Bridge between `/mcp` HTTP connections and the dispatcher.
///
/// Cheap to clone; clones share the same pending table and inbound sequence.
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<Inner>,
}

impl HttpTransport {
    pub fn new(policy: PendingPolicy, reply_timeout: Option<Duration>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                policy,
                reply_timeout,
                state: Mutex::new(BridgeState {
                    inbound_tx: Some(tx),
                    pending: VecDeque::new(),
                }),
                inbound_rx: Mutex::new(Some(rx)),
            }),
        }
    }

    pub fn from_config(bridge: &BridgeConfig, timeouts: &TimeoutConfig) -> Self {
        Self::new(
            bridge.pending_policy,
            timeouts.reply_secs.map(Duration::from_secs),
        )
    }

    /// Publish the body of a `/mcp` request and park its connection.
    ///
    /// Requests without a header terminator are logged and dropped: no
    /// message is produced and the connection is closed.
    pub async fn handle(&self, mut connection: Connection, raw: &[u8]) {
        let id = connection.id();
        let Some(body) = split_body(raw) else {
            tracing::error!(connection_id = %id, "Could not extract MCP payload from HTTP request");
            metrics::record_bridge_message("dropped");
            connection.close().await;
            return;
        };

        let displaced = {
            let mut state = self.inner.state.lock().await;
            let Some(tx) = state.inbound_tx.clone() else {
                drop(state);
                tracing::warn!(connection_id = %id, "Bridge disconnected, refusing MCP request");
                metrics::record_bridge_message("dropped");
                connection.close().await;
                return;
            };

            let displaced: Vec<Connection> = match self.inner.policy {
                PendingPolicy::SingleSlot => state.pending.drain(..).collect(),
                PendingPolicy::Queued => Vec::new(),
            };

            connection.set_state(ConnectionState::AwaitingBridgeReply);
            state.pending.push_back(connection);

            // Recorded before publishing so the dispatcher always finds its recipient.
            let message = InboundMessage {
                connection_id: id,
                payload: body.to_vec(),
            };
            if tx.send(message).is_err() {
                tracing::warn!(connection_id = %id, "Inbound consumer gone, dropping MCP request");
                metrics::record_bridge_message("dropped");
                let orphan = state.take_pending(id);
                drop(state);
                if let Some(orphan) = orphan {
                    orphan.close().await;
                }
                return;
            }
            displaced
        };

        tracing::debug!(connection_id = %id, bytes = body.len(), "MCP message received");
        metrics::record_bridge_message("inbound");

        for orphan in displaced {
            tracing::warn!(
                connection_id = %orphan.id(),
                replaced_by = %id,
                "Pending MCP request displaced before it was answered"
            );
            metrics::record_bridge_message("displaced");
            orphan.close().await;
        }

        if let Some(timeout) = self.inner.reply_timeout {
            let bridge = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if bridge.expire(id).await {
                    tracing::warn!(connection_id = %id, timeout = ?timeout, "MCP reply timed out");
                }
            });
        }
    }

    /// Close a pending connection without answering it. Returns whether it was pending.
    pub async fn expire(&self, id: ConnectionId) -> bool {
        let connection = self.inner.state.lock().await.take_pending(id);
        match connection {
            Some(connection) => {
                metrics::record_bridge_message("expired");
                connection.close().await;
                true
            }
            None => false,
        }
    }

    /// Number of connections waiting for a reply.
    pub async fn pending_count(&self) -> usize {
        self.inner.state.lock().await.pending.len()
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.state.lock().await.inbound_tx.is_some()
    }

    async fn write_reply(connection: Connection, payload: &[u8]) -> Result<(), TransportError> {
        let id = connection.id();
        let response = Response::mcp(payload).to_bytes();
        match connection.respond_and_close(&response).await {
            Ok(()) => {
                tracing::debug!(connection_id = %id, bytes = payload.len(), "MCP response sent");
                metrics::record_bridge_message("outbound");
                Ok(())
            }
            Err(source) => {
                tracing::error!(connection_id = %id, error = %source, "Error sending MCP response");
                metrics::record_bridge_message("write_failed");
                Err(TransportError::Write { id, source })
            }
        }
    }
}

impl Transport for HttpTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) {
        let pending = {
            let mut state = self.inner.state.lock().await;
            state.inbound_tx = None;
            std::mem::take(&mut state.pending)
        };
        tracing::info!(pending = pending.len(), "MCP transport disconnected");
        for connection in pending {
            connection.close().await;
        }
    }

    async fn send(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        let connection = self.inner.state.lock().await.pending.pop_front();
        match connection {
            Some(connection) => Self::write_reply(connection, &payload).await,
            None => {
                tracing::error!("No active connection to send data");
                Err(TransportError::NoPendingConnection)
            }
        }
    }

    async fn reply(&self, to: ConnectionId, payload: Vec<u8>) -> Result<(), TransportError> {
        let connection = self.inner.state.lock().await.take_pending(to);
        match connection {
            Some(connection) => Self::write_reply(connection, &payload).await,
            None => {
                tracing::error!(connection_id = %to, "Reply target is not awaiting a response");
                Err(TransportError::UnknownConnection(to))
            }
        }
    }

    async fn receive(&self) -> Option<InboundReceiver> {
        self.inner.inbound_rx.lock().await.take()
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("policy", &self.inner.policy)
            .field("reply_timeout", &self.inner.reply_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::ConnectionTracker;
    use tokio::io::{AsyncReadExt, DuplexStream};

    fn connection(tracker: &ConnectionTracker) -> (Connection, DuplexStream) {
        let (server, client) = tokio::io::duplex(4096);
        (Connection::new(server, None, tracker.track()), client)
    }

    async fn read_all(mut client: DuplexStream) -> String {
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn handle_publishes_body_and_send_answers() {
        let tracker = ConnectionTracker::new();
        let bridge = HttpTransport::new(PendingPolicy::Queued, None);
        let mut inbound = bridge.receive().await.unwrap();
        let (conn, client) = connection(&tracker);
        let id = conn.id();

        bridge
            .handle(conn, b"POST /mcp HTTP/1.1\r\nContent-Length: 13\r\n\r\n{\"id\":1,\"x\":2}")
            .await;
        let message = inbound.recv().await.unwrap();
        assert_eq!(message.connection_id, id);
        assert_eq!(message.payload, br#"{"id":1,"x":2}"#);
        assert_eq!(bridge.pending_count().await, 1);

        bridge.send(br#"{"id":1,"ok":true}"#.to_vec()).await.unwrap();
        let response = read_all(client).await;
        assert_eq!(
            response,
            "HTTP/1.1 200 OK\r\nContent-Type: application/mcp+json\r\nContent-Length: 18\r\nConnection: close\r\n\r\n{\"id\":1,\"ok\":true}"
        );
        assert_eq!(bridge.pending_count().await, 0);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn missing_separator_is_dropped() {
        let tracker = ConnectionTracker::new();
        let bridge = HttpTransport::new(PendingPolicy::Queued, None);
        let mut inbound = bridge.receive().await.unwrap();
        let (conn, client) = connection(&tracker);

        bridge.handle(conn, b"POST /mcp HTTP/1.1\r\nHost: x\r\n").await;
        assert!(inbound.try_recv().is_err());
        assert_eq!(bridge.pending_count().await, 0);
        assert_eq!(read_all(client).await, "");
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn send_without_pending_is_reported() {
        let bridge = HttpTransport::new(PendingPolicy::Queued, None);
        let err = bridge.send(b"{}".to_vec()).await.unwrap_err();
        assert!(matches!(err, TransportError::NoPendingConnection));
    }

    #[tokio::test]
    async fn receive_is_single_consumer() {
        let bridge = HttpTransport::new(PendingPolicy::Queued, None);
        assert!(bridge.receive().await.is_some());
        assert!(bridge.receive().await.is_none());
    }

    #[tokio::test]
    async fn queued_policy_replies_to_the_right_connection() {
        let tracker = ConnectionTracker::new();
        let bridge = HttpTransport::new(PendingPolicy::Queued, None);
        let mut inbound = bridge.receive().await.unwrap();
        let (first, first_client) = connection(&tracker);
        let (second, second_client) = connection(&tracker);

        bridge.handle(first, b"POST /mcp HTTP/1.1\r\n\r\none").await;
        bridge.handle(second, b"POST /mcp HTTP/1.1\r\n\r\ntwo").await;
        let one = inbound.recv().await.unwrap();
        let two = inbound.recv().await.unwrap();

        bridge.reply(two.connection_id, b"reply-two".to_vec()).await.unwrap();
        bridge.reply(one.connection_id, b"reply-one".to_vec()).await.unwrap();

        assert!(read_all(first_client).await.ends_with("reply-one"));
        assert!(read_all(second_client).await.ends_with("reply-two"));
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn single_slot_policy_displaces_older_request() {
        let tracker = ConnectionTracker::new();
        let bridge = HttpTransport::new(PendingPolicy::SingleSlot, None);
        let mut inbound = bridge.receive().await.unwrap();
        let (first, first_client) = connection(&tracker);
        let (second, second_client) = connection(&tracker);

        bridge.handle(first, b"POST /mcp HTTP/1.1\r\n\r\none").await;
        bridge.handle(second, b"POST /mcp HTTP/1.1\r\n\r\ntwo").await;
        assert_eq!(bridge.pending_count().await, 1);
        assert_eq!(read_all(first_client).await, "");

        let one = inbound.recv().await.unwrap();
        let err = bridge.reply(one.connection_id, b"late".to_vec()).await.unwrap_err();
        assert!(matches!(err, TransportError::UnknownConnection(_)));

        bridge.send(b"answer".to_vec()).await.unwrap();
        assert!(read_all(second_client).await.ends_with("answer"));
    }

    #[tokio::test]
    async fn disconnect_ends_inbound_and_closes_pending() {
        let tracker = ConnectionTracker::new();
        let bridge = HttpTransport::new(PendingPolicy::Queued, None);
        let mut inbound = bridge.receive().await.unwrap();
        let (conn, client) = connection(&tracker);

        bridge.handle(conn, b"POST /mcp HTTP/1.1\r\n\r\n{}").await;
        bridge.disconnect().await;

        assert!(inbound.recv().await.is_some());
        assert!(inbound.recv().await.is_none());
        assert_eq!(read_all(client).await, "");
        assert!(!bridge.is_connected().await);

        let (late, _late_client) = connection(&tracker);
        bridge.handle(late, b"POST /mcp HTTP/1.1\r\n\r\n{}").await;
        assert_eq!(bridge.pending_count().await, 0);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reply_timeout_expires_pending_connection() {
        let tracker = ConnectionTracker::new();
        let bridge = HttpTransport::new(PendingPolicy::Queued, Some(Duration::from_secs(5)));
        let _inbound = bridge.receive().await.unwrap();
        let (conn, client) = connection(&tracker);

        bridge.handle(conn, b"POST /mcp HTTP/1.1\r\n\r\n{}").await;
        assert_eq!(bridge.pending_count().await, 1);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(bridge.pending_count().await, 0);
        assert_eq!(read_all(client).await, "");
    }
}
