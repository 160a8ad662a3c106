//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the process-scoped services (bridge, server manager, dispatcher)
//! - Start the dispatcher before the listener so no request waits on nobody
//! - Tear down in reverse: stop accepting, disconnect the bridge, join the dispatcher
//!
//! # Design Decisions
//! - Fail fast: bind failure is fatal
//! - No global state; the `Gateway` value owns every service

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::GatewayConfig;
use crate::http::ServerManager;
use crate::lifecycle::signals::wait_for_shutdown_signal;
use crate::mcp::server::ServerError;
use crate::mcp::{EventSource, HttpTransport, McpServer, ToolRegistry, Transport};
use crate::net::ListenerError;

/// The running application: HTTP front-end plus control-protocol dispatcher.
pub struct Gateway {
    manager: ServerManager,
    dispatcher: McpServer,
    dispatcher_task: Option<JoinHandle<Result<(), ServerError>>>,
}

impl Gateway {
    pub fn new(config: GatewayConfig, events: Arc<dyn EventSource>) -> Self {
        let bridge = HttpTransport::from_config(&config.bridge, &config.timeouts);
        let dispatcher = McpServer::new(config.server_info.clone(), ToolRegistry::new(events));
        Self {
            manager: ServerManager::new(config, bridge),
            dispatcher,
            dispatcher_task: None,
        }
    }

    /// Start the dispatcher, then bind and serve.
    pub async fn start(&mut self) -> Result<SocketAddr, ListenerError> {
        if self.dispatcher_task.is_none() {
            let dispatcher = self.dispatcher.clone();
            let bridge = self.manager.bridge().clone();
            self.dispatcher_task = Some(tokio::spawn(async move { dispatcher.run(&bridge).await }));
        }
        self.manager.start().await
    }

    pub fn manager(&self) -> &ServerManager {
        &self.manager
    }

    /// Stop accepting, end the inbound sequence and wait for the dispatcher.
    pub async fn shutdown(&mut self) {
        self.manager.stop().await;
        self.manager.bridge().disconnect().await;
        if let Some(task) = self.dispatcher_task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "MCP dispatcher failed"),
                Err(e) => tracing::error!(error = %e, "MCP dispatcher task panicked"),
            }
        }
        tracing::info!("Shutdown complete");
    }

    /// Serve until SIGINT/SIGTERM.
    pub async fn run_until_signal(mut self) -> Result<(), ListenerError> {
        let addr = self.start().await?;
        tracing::info!(
            address = %addr,
            health = %self.manager.health_check_endpoint().await,
            "Gateway ready"
        );
        wait_for_shutdown_signal().await;
        self.shutdown().await;
        Ok(())
    }
}
