//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (id, lifecycle state, tracking)
//!     → request_line.rs (method, path, body slice)
//!     → Hand off to the route table
//!
//! Connection States:
//!     Open → Reading → Responding | AwaitingBridgeReply → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - One read per connection, capped by the receive buffer size; `/mcp` alone
//!   continues until a declared `Content-Length` has arrived
//! - Every response closes the connection (no keep-alive)

pub mod connection;
pub mod listener;
pub mod request_line;

pub use connection::{Connection, ConnectionId, ConnectionState, ConnectionTracker};
pub use listener::{Listener, ListenerError};
pub use request_line::{parse_request, split_body, ParseError, Request};
