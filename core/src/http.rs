//! HTTP message types as plain data.
//!
//! # Design
//! `Request` values are built by the verb builders in `client` and rendered
//! to a wire header block here, so the exact bytes a request puts on the
//! socket can be checked without a network. Rendering applies the fixed
//! field limits of the wire format (path, proxied host, content type):
//! oversized inputs are cut, never rejected.

use std::fmt;

use crate::context::Context;
use crate::error::Error;

/// Value of the `User-Agent` header sent with every request.
pub const USER_AGENT: &str = concat!("minihttp/", env!("CARGO_PKG_VERSION"));

/// Longest resource path put on the request line, in bytes.
pub const MAX_PATH: usize = 256;

/// Longest target host put in a proxied request line, in bytes.
pub const MAX_PROXY_HOST: usize = 128;

/// Longest `Content-type` value sent, in bytes.
pub const MAX_CONTENT_TYPE: usize = 64;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status code forwarded from the server's status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Status(pub u16);

impl Status {
    pub const OK: Status = Status(200);
    pub const CREATED: Status = Status(201);

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// 200 and 201, the statuses a transfer counts as successful.
    pub fn is_success(&self) -> bool {
        matches!(self.0, 200 | 201)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse `HTTP/1.<minor> <status>`; anything after the status is ignored.
pub fn parse_status_line(line: &str) -> Result<Status, Error> {
    let invalid = || Error::ParseStatus {
        line: line.to_string(),
    };
    let rest = line.strip_prefix("HTTP/1.").ok_or_else(invalid)?;
    let minor_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if minor_len == 0 {
        return Err(invalid());
    }
    let rest = rest[minor_len..].trim_start();
    let code_len = rest.bytes().take(3).take_while(u8::is_ascii_digit).count();
    if code_len == 0 {
        return Err(invalid());
    }
    rest[..code_len].parse().map(Status).map_err(|_| invalid())
}

/// An HTTP request described as plain data.
///
/// `path` is the resource path without its leading `/`. `headers` are the
/// additional headers placed after `User-Agent` and `Authorization`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// The request target: `/path`, or the absolute form when proxying.
    pub fn target(&self, ctx: &Context) -> String {
        let path = truncate(&self.path, MAX_PATH);
        match ctx.active_proxy() {
            Some(_) => format!(
                "http://{}:{}/{}",
                truncate(ctx.server_or_fallback(), MAX_PROXY_HOST),
                ctx.port,
                path
            ),
            None => format!("/{path}"),
        }
    }

    /// Render the request line and headers, ending with the blank line.
    pub fn head_block(&self, ctx: &Context) -> String {
        let mut block = format!(
            "{} {} HTTP/1.0\r\nUser-Agent: {}\r\n",
            self.method,
            self.target(ctx),
            USER_AGENT
        );
        if let Some(token) = ctx.auth_token.as_deref() {
            block.push_str("Authorization: Basic ");
            block.push_str(token);
            block.push_str("\r\n");
        }
        for (name, value) in &self.headers {
            block.push_str(name);
            block.push_str(": ");
            block.push_str(value);
            block.push_str("\r\n");
        }
        block.push_str("\r\n");
        block
    }
}

/// The part of a response head this library interprets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    /// `Content-Length`, when present and non-negative.
    pub content_length: Option<u64>,
    /// First token of `Content-Type`, case preserved.
    pub content_type: Option<String>,
}

/// Result of GET, HEAD and POST.
///
/// For statuses other than 200 only `status` is set: no header or body is
/// read from such responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub(crate) fn status_only(status: Status) -> Self {
        Self {
            status,
            content_length: None,
            content_type: None,
            body: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Cut `s` to at most `max` bytes without splitting a character.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
