//! Response rendering.
//!
//! # Responsibilities
//! - Render status line, fixed headers and body into wire bytes
//! - Provide the canned liveness and not-found responses
//!
//! # Design Decisions
//! - Every response carries `Content-Length` and `Connection: close`
//! - No header customisation beyond the content type

/// Media type of control-protocol replies.
pub const MCP_CONTENT_TYPE: &str = "application/mcp+json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

/// HTTP status codes this server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
        }
    }
}

/// A complete response, always closing the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<'a> {
    pub status: Status,
    pub content_type: &'a str,
    pub body: &'a [u8],
}

impl<'a> Response<'a> {
    /// `200 OK`, `text/plain`, body `OK`.
    pub fn healthy() -> Self {
        Self {
            status: Status::Ok,
            content_type: TEXT_CONTENT_TYPE,
            body: b"OK",
        }
    }

    /// `404 Not Found`, `text/plain`, body `Not Found`.
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            content_type: TEXT_CONTENT_TYPE,
            body: b"Not Found",
        }
    }

    /// `200 OK` carrying a control-protocol payload.
    pub fn mcp(payload: &'a [u8]) -> Self {
        Self {
            status: Status::Ok,
            content_type: MCP_CONTENT_TYPE,
            body: payload,
        }
    }

    /// Render to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status.code(),
            self.status.reason(),
            self.content_type,
            self.body.len(),
        );
        let mut bytes = Vec::with_capacity(head.len() + self.body.len());
        bytes.extend_from_slice(head.as_bytes());
        bytes.extend_from_slice(self.body);
        bytes
    }
}
