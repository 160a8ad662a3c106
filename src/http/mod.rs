//! HTTP front-end subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, per-connection task)
//!     → net::request_line (method, path)
//!     → routing (Liveness | ControlProtocol | NotFound)
//!     → response.rs (canned response, close)
//!       or mcp::transport (bridge, reply later, close)
//!
//! manager.rs owns the running server: start / stop / restart.
//! ```

pub mod manager;
pub mod response;
pub mod server;

pub use manager::ServerManager;
pub use response::{Response, Status, MCP_CONTENT_TYPE};
pub use server::HttpServer;
