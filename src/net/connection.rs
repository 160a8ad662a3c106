//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing and bridge bookkeeping
//! - Track connection state (Open → Reading → Responding/AwaitingBridgeReply → Closed)
//! - Count live connections so "closed exactly once" is observable
//!
//! A [`Connection`] owns its stream and a [`ConnectionGuard`]. Whoever holds the
//! `Connection` owns the socket; dropping it closes the socket and releases the
//! guard.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::net::request_line::awaiting_body;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, nothing read yet.
    Open,
    /// Reading the request.
    Reading,
    /// Writing a canned response.
    Responding,
    /// Parked in the bridge until the dispatcher replies.
    AwaitingBridgeReply,
    /// Closed.
    Closed,
}

/// Byte stream a connection runs over. TCP in production, in-memory pipes in tests.
pub trait ConnectionStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> ConnectionStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Counts live connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        crate::observability::metrics::record_connection_opened();
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let remaining = self.active_count.fetch_sub(1, Ordering::SeqCst) - 1;
        crate::observability::metrics::record_connection_closed();
        tracing::trace!(connection_id = %self.id, remaining, "Connection closed");
    }
}

/// An accepted connection, exclusively owned by whichever handler is processing it.
pub struct Connection {
    stream: Box<dyn ConnectionStream>,
    peer_addr: Option<SocketAddr>,
    state: ConnectionState,
    guard: ConnectionGuard,
}

impl Connection {
    pub fn new<S: ConnectionStream>(
        stream: S,
        peer_addr: Option<SocketAddr>,
        guard: ConnectionGuard,
    ) -> Self {
        Self {
            stream: Box::new(stream),
            peer_addr,
            state: ConnectionState::Open,
            guard,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.guard.id()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn set_state(&mut self, state: ConnectionState) {
        tracing::trace!(connection_id = %self.id(), from = ?self.state, to = ?state, "State change");
        self.state = state;
    }

    /// One read of at most `cap` bytes. An empty result means the peer closed.
    pub async fn read_request(&mut self, cap: usize) -> std::io::Result<Vec<u8>> {
        self.set_state(ConnectionState::Reading);
        let mut buf = vec![0u8; cap];
        let n = self.stream.read(&mut buf).await?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Keep reading into `raw` while complete headers declare a longer body
    /// than has arrived. Stops at `cap` bytes or when the peer closes.
    pub async fn read_declared_body(&mut self, raw: &mut Vec<u8>, cap: usize) -> std::io::Result<()> {
        let mut filled = raw.len();
        raw.resize(cap.max(filled), 0);
        let result = loop {
            if filled >= cap || !awaiting_body(&raw[..filled]) {
                break Ok(());
            }
            match self.stream.read(&mut raw[filled..]).await {
                Ok(0) => break Ok(()),
                Ok(n) => filled += n,
                Err(e) => break Err(e),
            }
        };
        raw.truncate(filled);
        result
    }

    /// Write the whole response, then close. Closing happens even if the write fails.
    pub async fn respond_and_close(mut self, response: &[u8]) -> std::io::Result<()> {
        self.set_state(ConnectionState::Responding);
        let result = self.write_all_and_flush(response).await;
        self.close().await;
        result
    }

    async fn write_all_and_flush(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }

    /// Shut down the write half and drop the stream.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(connection_id = %self.id(), error = %e, "Shutdown failed");
        }
        self.state = ConnectionState::Closed;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id())
            .field("peer_addr", &self.peer_addr)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("conn-"));
    }

    #[test]
    fn connection_tracker_counts() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track();
        assert_eq!(tracker.active_count(), 1);

        let guard2 = tracker.track();
        assert_eq!(tracker.active_count(), 2);

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn respond_and_close_writes_then_releases_guard() {
        let tracker = ConnectionTracker::new();
        let (server, mut client) = tokio::io::duplex(1024);
        let mut conn = Connection::new(server, None, tracker.track());

        client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
        let raw = conn.read_request(2048).await.unwrap();
        assert_eq!(raw, b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(conn.state(), ConnectionState::Reading);

        conn.respond_and_close(b"hello").await.unwrap();
        assert_eq!(tracker.active_count(), 0);

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"hello");
    }

    #[tokio::test]
    async fn declared_body_is_read_to_completion() {
        let tracker = ConnectionTracker::new();
        let (server, mut client) = tokio::io::duplex(1024);
        let mut conn = Connection::new(server, None, tracker.track());

        client
            .write_all(b"POST /mcp HTTP/1.1\r\nContent-Length: 4\r\n\r\n")
            .await
            .unwrap();
        let mut raw = conn.read_request(2048).await.unwrap();
        assert!(raw.ends_with(b"\r\n\r\n"));

        client.write_all(b"ping").await.unwrap();
        conn.read_declared_body(&mut raw, 2048).await.unwrap();
        assert!(raw.ends_with(b"\r\n\r\nping"));
    }

    #[tokio::test]
    async fn read_request_does_not_wait_for_declared_body() {
        let tracker = ConnectionTracker::new();
        let (server, mut client) = tokio::io::duplex(1024);
        let mut conn = Connection::new(server, None, tracker.track());

        client
            .write_all(b"GET /healthz HTTP/1.1\r\nContent-Length: 10\r\n\r\n")
            .await
            .unwrap();
        let raw = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            conn.read_request(2048),
        )
        .await
        .expect("single read returns without the body")
        .unwrap();
        assert!(raw.ends_with(b"Content-Length: 10\r\n\r\n"));
        drop(client);
    }

    #[tokio::test]
    async fn declared_body_read_stops_when_peer_closes() {
        let tracker = ConnectionTracker::new();
        let (server, mut client) = tokio::io::duplex(1024);
        let mut conn = Connection::new(server, None, tracker.track());

        client
            .write_all(b"POST /mcp HTTP/1.1\r\nContent-Length: 50\r\n\r\nab")
            .await
            .unwrap();
        let mut raw = conn.read_request(2048).await.unwrap();
        drop(client);
        conn.read_declared_body(&mut raw, 2048).await.unwrap();
        assert!(raw.ends_with(b"\r\n\r\nab"));
    }

    #[tokio::test]
    async fn read_is_capped() {
        let tracker = ConnectionTracker::new();
        let (server, mut client) = tokio::io::duplex(1024);
        let mut conn = Connection::new(server, None, tracker.track());

        client.write_all(&[b'a'; 100]).await.unwrap();
        let raw = conn.read_request(16).await.unwrap();
        assert_eq!(raw.len(), 16);
    }
}
