//! Minimal HTTP front-end bridging `/mcp` requests into a JSON-RPC control protocol.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mcp;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use http::{HttpServer, ServerManager};
pub use lifecycle::{Gateway, Shutdown};
pub use mcp::{HttpTransport, McpServer, Transport};
