//! Absolute `http://host[:port]/path` URL parsing.
//!
//! Only the `http` scheme is understood. The path is returned without its
//! leading slash; the request builder adds it back when rendering the
//! request line.

use tracing::debug;

use crate::error::Error;

/// Port used when the URL does not name one.
pub const DEFAULT_PORT: u16 = 80;

const SCHEME: &str = "http://";

/// The three parts of a parsed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub host: String,
    pub port: u16,
    /// Resource path without the leading `/`; empty when the URL has none.
    pub path: String,
}

/// Parse `http://host[:port]/path`.
///
/// The scheme is matched case-insensitively. The host runs up to the first
/// `:` or `/`; a port, when present, must be a decimal `u16` ending at the
/// next `/` or at the end of the input.
pub fn parse(url: &str) -> Result<Url, Error> {
    let has_scheme = url
        .get(..SCHEME.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(SCHEME));
    if !has_scheme {
        debug!(url, "invalid url (must start with 'http://')");
        return Err(Error::UrlScheme(url.to_string()));
    }

    let rest = &url[SCHEME.len()..];
    let host_end = rest.find([':', '/']).unwrap_or(rest.len());
    let host = &rest[..host_end];
    let mut tail = &rest[host_end..];

    let mut port = DEFAULT_PORT;
    if let Some(after_colon) = tail.strip_prefix(':') {
        let port_end = after_colon.find('/').unwrap_or(after_colon.len());
        port = parse_port(&after_colon[..port_end]).ok_or_else(|| {
            debug!(url, "invalid port in url");
            Error::UrlPort(url.to_string())
        })?;
        tail = &after_colon[port_end..];
    }

    let path = tail.strip_prefix('/').unwrap_or(tail);
    let parsed = Url {
        host: host.to_string(),
        port,
        path: path.to_string(),
    };
    debug!(host = %parsed.host, port = parsed.port, path = %parsed.path, "parsed url");
    Ok(parsed)
}

fn parse_port(digits: &str) -> Option<u16> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
