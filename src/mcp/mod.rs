//! Control-protocol subsystem.
//!
//! # Data Flow
//! ```text
//! /mcp connection + raw bytes
//!     → transport.rs (extract body, park connection, inbound channel)
//!     → server.rs (decode JSON-RPC, dispatch)
//!     → tools.rs (tool set behind the EventSource boundary)
//!     → transport.rs (200 + payload on the parked connection, close)
//! ```

pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use server::McpServer;
pub use tools::{Event, EventSource, InMemoryEvents, ToolRegistry};
pub use transport::{HttpTransport, InboundMessage, Transport, TransportError};
