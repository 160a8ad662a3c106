//! Request line parsing.
//!
//! Only as much of HTTP/1.1 as routing needs: the method and path from the
//! first line, and the body slice after the header terminator. Versions,
//! headers and framing are never validated.

/// Header/body separator.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Errors produced while reading the request line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("request is empty")]
    Empty,
    #[error("request line is not valid UTF-8")]
    InvalidUtf8,
    #[error("request line has fewer than two tokens")]
    MissingRequestLine,
}

/// Parsed view of one request. Borrowed from the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Bytes after the header terminator, `None` when no terminator was received.
    pub body: Option<&'a [u8]>,
}

impl<'a> Request<'a> {
    /// Body bytes, treating a missing terminator as an empty body.
    pub fn body_or_empty(&self) -> &'a [u8] {
        self.body.unwrap_or(&[])
    }
}

/// Parse the request line and locate the body.
pub fn parse_request(raw: &[u8]) -> Result<Request<'_>, ParseError> {
    if raw.is_empty() {
        return Err(ParseError::Empty);
    }

    let line_end = raw.iter().position(|&b| b == b'\n').unwrap_or(raw.len());
    let line = &raw[..line_end];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8)?;

    let mut tokens = line.split_whitespace();
    let (method, path) = match (tokens.next(), tokens.next()) {
        (Some(method), Some(path)) => (method, path),
        _ => return Err(ParseError::MissingRequestLine),
    };

    Ok(Request {
        method,
        path,
        body: split_body(raw),
    })
}

/// Bytes following the first header terminator, if present.
pub fn split_body(raw: &[u8]) -> Option<&[u8]> {
    raw.windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
        .map(|start| &raw[start + HEADER_TERMINATOR.len()..])
}

/// Declared `Content-Length`, if the header block carries a parseable one.
pub fn content_length(raw: &[u8]) -> Option<usize> {
    let head_end = raw
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)?;
    let head = std::str::from_utf8(&raw[..head_end]).ok()?;
    head.lines().skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// True when the headers are complete and declare more body than has arrived.
///
/// Requests without a header terminator never wait for more data.
pub fn awaiting_body(raw: &[u8]) -> bool {
    match (split_body(raw), content_length(raw)) {
        (Some(body), Some(declared)) => body.len() < declared,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_length_is_case_insensitive() {
        let raw = b"POST /mcp HTTP/1.1\r\ncontent-length: 4\r\n\r\nab";
        assert_eq!(content_length(raw), Some(4));
        assert!(awaiting_body(raw));
        assert!(!awaiting_body(b"POST /mcp HTTP/1.1\r\nContent-Length: 2\r\n\r\nab"));
    }

    #[test]
    fn longer_body_than_declared_is_complete() {
        let raw = b"POST /mcp HTTP/1.1\r\nContent-Length: 13\r\n\r\n{\"id\":1,\"x\":2}";
        assert!(!awaiting_body(raw));
    }

    #[test]
    fn no_terminator_never_waits() {
        assert!(!awaiting_body(b"POST /mcp HTTP/1.1\r\nContent-Length: 10\r\n"));
        assert_eq!(content_length(b"POST /mcp HTTP/1.1\r\nContent-Length: 10\r\n"), None);
    }

    #[test]
    fn parses_method_path_and_body() {
        let req = parse_request(b"POST /mcp HTTP/1.1\r\nContent-Length: 13\r\n\r\n{\"id\":1,\"x\":2}")
            .unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/mcp");
        assert_eq!(req.body, Some(&b"{\"id\":1,\"x\":2}"[..]));
    }

    #[test]
    fn version_is_optional() {
        let req = parse_request(b"GET /healthz").unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/healthz");
        assert_eq!(req.body, None);
        assert!(req.body_or_empty().is_empty());
    }

    #[test]
    fn single_token_is_rejected() {
        assert_eq!(
            parse_request(b"GARBAGE\r\n\r\n"),
            Err(ParseError::MissingRequestLine)
        );
        assert_eq!(parse_request(b"\r\n\r\n"), Err(ParseError::MissingRequestLine));
        assert_eq!(parse_request(b""), Err(ParseError::Empty));
    }

    #[test]
    fn non_utf8_line_is_rejected() {
        assert_eq!(
            parse_request(b"GET /\xff\xfe HTTP/1.1\r\n\r\n"),
            Err(ParseError::InvalidUtf8)
        );
    }

    #[test]
    fn only_first_separator_splits() {
        let raw = b"POST /mcp HTTP/1.1\r\n\r\nfirst\r\n\r\nsecond";
        assert_eq!(split_body(raw), Some(&b"first\r\n\r\nsecond"[..]));
    }

    #[test]
    fn empty_body_after_separator() {
        assert_eq!(split_body(b"GET / HTTP/1.1\r\n\r\n"), Some(&b""[..]));
        assert_eq!(split_body(b"GET / HTTP/1.1\r\nHost: x\r\n"), None);
    }
}
