//! Minimal blocking HTTP client for moving resources with PUT, GET, POST,
//! HEAD and DELETE.
//!
//! # Overview
//! One request per connection, HTTP/1.0 on the wire, and only as much
//! response parsing as resource transfer needs: the status line plus the
//! `Content-Length` and `Content-Type` headers. Bodies are read by declared
//! length or, when none is given, until the server closes the connection.
//!
//! # Design
//! - `Context` carries everything a request needs (target, proxy, Basic-Auth
//!   token, injected capabilities). It is an ordinary value owned by the
//!   caller; there is no global state, so independent contexts can be used
//!   from different threads at once.
//! - `query` performs the exchange up to the status line; the verbs in
//!   `client` build on it with their own header and body policies.
//! - Each verb has a pure `build_*` counterpart so the exact request can be
//!   inspected without a network.
//! - All I/O is blocking with no timeouts; a stalled peer blocks the call.
//! - Failures are `Error` variants with stable negative `code()`s; server
//!   statuses are always returned as `Status`, never as errors.

pub mod client;
pub mod context;
pub mod error;
pub mod http;
pub mod query;
pub mod reader;
pub mod url;

pub use client::{build_delete, build_get, build_head, build_post, build_put};
#[cfg(feature = "base64")]
pub use context::StandardBase64;
pub use context::{Base64Encoder, BodyReader, Context, Proxy};
pub use error::Error;
pub use http::{Method, Request, Response, ResponseHead, Status};
pub use query::{query, Connection, QueryMode};
pub use url::Url;
