//! Process-scoped owner of the running HTTP server.
//!
//! Built once at startup and passed by reference to whatever needs to start,
//! stop or inspect the server. Starting always stops the previous server
//! first, and stopping waits until the socket is released, so restarts on the
//! same port never race.

use std::net::SocketAddr;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::GatewayConfig;
use crate::http::server::HttpServer;
use crate::lifecycle::Shutdown;
use crate::mcp::HttpTransport;
use crate::net::{ConnectionTracker, Listener, ListenerError};

struct RunningServer {
    shutdown: Shutdown,
    task: JoinHandle<()>,
    local_addr: SocketAddr,
    tracker: ConnectionTracker,
}

/// Starts, stops and reports on the HTTP server.
pub struct ServerManager {
    config: GatewayConfig,
    bridge: HttpTransport,
    running: Mutex<Option<RunningServer>>,
}

impl ServerManager {
    pub fn new(config: GatewayConfig, bridge: HttpTransport) -> Self {
        Self {
            config,
            bridge,
            running: Mutex::new(None),
        }
    }

    /// Start on the configured bind address.
    pub async fn start(&self) -> Result<SocketAddr, ListenerError> {
        let address = self.config.listener.bind_address.clone();
        self.start_on(address).await
    }

    /// Start on the configured host with a specific port.
    pub async fn start_on_port(&self, port: u16) -> Result<SocketAddr, ListenerError> {
        let address = format!("{}:{}", self.config.listener.bind_host(), port);
        self.start_on(address).await
    }

    async fn start_on(&self, bind_address: String) -> Result<SocketAddr, ListenerError> {
        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            Self::shutdown_server(previous).await;
        }

        let mut listener_config = self.config.listener.clone();
        listener_config.bind_address = bind_address;
        let listener = Listener::bind(&listener_config).await?;
        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            address: listener_config.bind_address.clone(),
            source,
        })?;

        let server = HttpServer::new(&self.config, self.bridge.clone());
        let tracker = server.tracker();
        let shutdown = Shutdown::new();
        let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

        *running = Some(RunningServer {
            shutdown,
            task,
            local_addr,
            tracker,
        });
        tracing::info!(address = %local_addr, "Server manager: HTTP server started");
        Ok(local_addr)
    }

    /// Stop accepting and release the socket. No-op if nothing is running.
    pub async fn stop(&self) {
        let previous = self.running.lock().await.take();
        if let Some(previous) = previous {
            Self::shutdown_server(previous).await;
        }
    }

    async fn shutdown_server(server: RunningServer) {
        server.shutdown.trigger();
        if let Err(e) = server.task.await {
            tracing::error!(error = %e, "HTTP server task failed");
        }
        tracing::info!(address = %server.local_addr, "Server manager: HTTP server stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Address of the running server.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|s| s.local_addr)
    }

    /// Connections of the running server that have not closed yet.
    pub async fn active_connections(&self) -> u64 {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|s| s.tracker.active_count())
            .unwrap_or(0)
    }

    async fn port(&self) -> u16 {
        match self.local_addr().await {
            Some(addr) => addr.port(),
            None => self
                .config
                .listener
                .bind_address
                .parse::<SocketAddr>()
                .map(|addr| addr.port())
                .unwrap_or(crate::config::schema::DEFAULT_PORT),
        }
    }

    /// URL a local client can probe, e.g. `http://localhost:8080/healthz`.
    pub async fn health_check_url(&self) -> String {
        format!(
            "http://localhost:{}{}",
            self.port().await,
            self.config.routes.health_path
        )
    }

    /// Endpoint string for display, e.g. `http://0.0.0.0:8080/healthz`.
    pub async fn health_check_endpoint(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.config.listener.bind_host(),
            self.port().await,
            self.config.routes.health_path
        )
    }

    pub fn bridge(&self) -> &HttpTransport {
        &self.bridge
    }
}
