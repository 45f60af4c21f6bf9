//! Error types for the HTTP exchange library.
//!
//! # Design
//! Every failure the library can report is a variant of one `Error` enum.
//! HTTP statuses are never errors: any status line the server sends is
//! forwarded as a `Status`, and only internal failures land here. `code()`
//! gives the stable negative integer used at the C boundary, so callers on
//! either side of the FFI see the same taxonomy.

use std::io;

use thiserror::Error;

/// Errors returned by URL parsing, context configuration and the verbs.
#[derive(Debug, Error)]
pub enum Error {
    /// The target (or proxy) host name did not resolve to an address.
    #[error("cannot resolve host {host}")]
    Host {
        host: String,
        #[source]
        source: io::Error,
    },

    /// A stream socket could not be created.
    #[error("cannot create socket: {0}")]
    Socket(#[source] io::Error),

    /// The socket was created but the connection was refused or failed.
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        addr: std::net::SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Writing the request line and headers failed.
    #[error("write error while sending request header: {0}")]
    WriteHeader(#[source] io::Error),

    /// Writing the request body failed.
    #[error("write error while sending request body: {0}")]
    WriteBody(#[source] io::Error),

    /// The status line or a header line could not be read.
    #[error("read error while reading response header: {0}")]
    ReadHeader(#[source] io::Error),

    /// The status line did not look like `HTTP/1.x nnn`.
    #[error("invalid status line: {line:?}")]
    ParseStatus { line: String },

    /// A response buffer could not be allocated.
    #[error("cannot allocate {size} bytes")]
    OutOfMemory { size: usize },

    /// The injected Base64 encoder reported a failure.
    #[error("base64 encoder failed")]
    Encoder,

    /// The URL does not start with `http://`.
    #[error("invalid url {0:?}: must start with 'http://'")]
    UrlScheme(String),

    /// The port following `host:` is not a valid port number.
    #[error("invalid port in url {0:?}")]
    UrlPort(String),

    /// A required argument or capability is missing.
    #[error("missing argument: {0}")]
    NullArgument(&'static str),

    /// Reading a body without a declared length failed.
    #[error("read error while reading body of unknown length: {0}")]
    ReadUnknownLength(#[source] io::Error),

    /// The connection ended before the declared content length was read.
    ///
    /// `partial` holds whatever was received; it is left empty by verbs that
    /// discard partial data. `content_type` is the type from the response
    /// head, which was fully read before the body.
    #[error("short body: expected {expected} bytes, received {}", partial.len())]
    ShortBody {
        expected: usize,
        partial: Vec<u8>,
        content_type: Option<String>,
    },
}

impl Error {
    /// The stable negative code for this error kind.
    pub fn code(&self) -> i32 {
        match self {
            Error::Host { .. } => -1,
            Error::Socket(_) => -2,
            Error::Connect { .. } => -3,
            Error::WriteHeader(_) => -4,
            Error::WriteBody(_) => -5,
            Error::ReadHeader(_) => -6,
            Error::ParseStatus { .. } => -7,
            Error::NullArgument(_) => -8,
            Error::ReadUnknownLength(_) => -9,
            Error::OutOfMemory { .. } | Error::Encoder => -10,
            Error::ShortBody { .. } => -11,
            Error::UrlScheme(_) => -12,
            Error::UrlPort(_) => -13,
        }
    }
}
