//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed request (method, path)
//!     → router.rs (exact path lookup)
//!     → Return: Liveness | ControlProtocol | NotFound
//! ```
//!
//! # Design Decisions
//! - Routes fixed at startup, immutable at runtime
//! - Deterministic: same path always resolves to the same route

pub mod router;

pub use router::{Route, RouteTable};
