//! Route lookup.
//!
//! # Responsibilities
//! - Store the fixed endpoint paths
//! - Resolve a parsed request to a route
//! - Return explicit NotFound rather than a silent default
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Exact path match, method is ignored

use crate::config::RoutesConfig;
use crate::net::request_line::ParseError;
use crate::net::Request;

/// Where a request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Canned `200 OK`.
    Liveness,
    /// Hand the connection to the transport bridge.
    ControlProtocol,
    /// Canned `404 Not Found`.
    NotFound,
}

impl Route {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Liveness => "liveness",
            Route::ControlProtocol => "mcp",
            Route::NotFound => "not_found",
        }
    }
}

/// Fixed route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    health_path: String,
    mcp_path: String,
}

impl RouteTable {
    pub fn new(health_path: impl Into<String>, mcp_path: impl Into<String>) -> Self {
        Self {
            health_path: health_path.into(),
            mcp_path: mcp_path.into(),
        }
    }

    pub fn from_config(config: &RoutesConfig) -> Self {
        Self::new(config.health_path.clone(), config.mcp_path.clone())
    }

    /// Resolve a path by exact match.
    pub fn resolve(&self, path: &str) -> Route {
        if path == self.health_path {
            Route::Liveness
        } else if path == self.mcp_path {
            Route::ControlProtocol
        } else {
            Route::NotFound
        }
    }

    /// Resolve a parse result; unparseable requests are not found.
    pub fn resolve_request(&self, parsed: &Result<Request<'_>, ParseError>) -> Route {
        match parsed {
            Ok(request) => self.resolve(request.path),
            Err(_) => Route::NotFound,
        }
    }

    pub fn health_path(&self) -> &str {
        &self.health_path
    }

    pub fn mcp_path(&self) -> &str {
        &self.mcp_path
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::from_config(&RoutesConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::parse_request;

    #[test]
    fn exact_matches() {
        let table = RouteTable::default();
        assert_eq!(table.resolve("/healthz"), Route::Liveness);
        assert_eq!(table.resolve("/mcp"), Route::ControlProtocol);
    }

    #[test]
    fn prefixes_and_suffixes_do_not_match() {
        let table = RouteTable::default();
        assert_eq!(table.resolve("/healthz/"), Route::NotFound);
        assert_eq!(table.resolve("/healthzz"), Route::NotFound);
        assert_eq!(table.resolve("/mcp?x=1"), Route::NotFound);
        assert_eq!(table.resolve("/"), Route::NotFound);
    }

    #[test]
    fn method_is_ignored() {
        let table = RouteTable::default();
        let parsed = parse_request(b"DELETE /mcp HTTP/1.1\r\n\r\n");
        assert_eq!(table.resolve_request(&parsed), Route::ControlProtocol);
    }

    #[test]
    fn parse_failure_is_not_found() {
        let table = RouteTable::default();
        let parsed = parse_request(b"nonsense");
        assert_eq!(table.resolve_request(&parsed), Route::NotFound);
    }

    #[test]
    fn custom_paths() {
        let table = RouteTable::new("/live", "/rpc");
        assert_eq!(table.resolve("/live"), Route::Liveness);
        assert_eq!(table.resolve("/rpc"), Route::ControlProtocol);
        assert_eq!(table.resolve("/healthz"), Route::NotFound);
    }
}
