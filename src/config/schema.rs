//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, buffer, limits).
    pub listener: ListenerConfig,

    /// Fixed endpoint paths.
    pub routes: RoutesConfig,

    /// Optional read/reply deadlines.
    pub timeouts: TimeoutConfig,

    /// Transport bridge behaviour.
    pub bridge: BridgeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Identity reported to control-protocol clients.
    pub server_info: ServerInfoConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum bytes read from a connection before parsing.
    pub receive_buffer_bytes: usize,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("{}:{}", DEFAULT_BIND_HOST, DEFAULT_PORT),
            receive_buffer_bytes: 2048,
            max_connections: 1024,
        }
    }
}

impl ListenerConfig {
    /// Host part of `bind_address`, falling back to all interfaces.
    pub fn bind_host(&self) -> &str {
        self.bind_address
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(DEFAULT_BIND_HOST)
    }
}

/// Paths served by the route table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Liveness endpoint.
    pub health_path: String,

    /// Control-protocol endpoint.
    pub mcp_path: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            health_path: "/healthz".to_string(),
            mcp_path: "/mcp".to_string(),
        }
    }
}

/// Timeout configuration. `None` disables the deadline.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for the initial read on an accepted connection.
    pub read_secs: Option<u64>,

    /// Deadline for the dispatcher to answer a pending `/mcp` request.
    pub reply_secs: Option<u64>,
}

/// How the bridge remembers connections waiting for a reply.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PendingPolicy {
    /// One slot; a newer request displaces the older one.
    SingleSlot,
    /// Keyed by connection, answered in arrival order.
    #[default]
    Queued,
}

/// Transport bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    pub pending_policy: PendingPolicy,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single line output.
    #[default]
    Compact,
    /// Structured JSON for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Name and version announced in the `initialize` result.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerInfoConfig {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfoConfig {
    fn default() -> Self {
        Self {
            name: "apple-mcp-server".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}
