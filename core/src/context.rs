//! Connection context: target, proxy, credentials and injected capabilities.
//!
//! # Design
//! A `Context` is a plain owned value. Every verb takes it by reference, so
//! any number of contexts can coexist and be used from different threads
//! without locking. Setters always replace the previous value as a whole;
//! nothing is merged.
//!
//! The two capabilities (Base64 encoding and streaming body consumption) are
//! single-method traits held behind `Arc`, which keeps the context `Clone`
//! and the core free of any particular encoding or framing library.

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use crate::error::Error;
use crate::url;

/// Port a context uses before any URL has been parsed into it.
pub const UNPARSED_PORT: u16 = 5757;

/// Host name used when no target has been parsed into the context.
pub const FALLBACK_SERVER: &str = "adonis";

/// Encodes `user:pass` credentials for the `Authorization: Basic` header.
pub trait Base64Encoder: Send + Sync {
    /// Standard Base64 of `input`, or `None` if encoding failed.
    fn encode(&self, input: &str) -> Option<String>;
}

impl<F> Base64Encoder for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn encode(&self, input: &str) -> Option<String> {
        self(input)
    }
}

/// Consumes a response body of unknown length directly from the connection.
///
/// Installed on a context, it replaces the default read-until-close reader
/// for GET and POST responses that carry no usable `Content-Length`.
pub trait BodyReader: Send + Sync {
    fn read_body(&self, body: &mut dyn Read) -> io::Result<()>;
}

impl<F> BodyReader for F
where
    F: Fn(&mut dyn Read) -> io::Result<()> + Send + Sync,
{
    fn read_body(&self, body: &mut dyn Read) -> io::Result<()> {
        self(body)
    }
}

/// Standard Base64 backed by the `base64` crate.
#[cfg(feature = "base64")]
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardBase64;

#[cfg(feature = "base64")]
impl Base64Encoder for StandardBase64 {
    fn encode(&self, input: &str) -> Option<String> {
        use base64::Engine;
        Some(base64::engine::general_purpose::STANDARD.encode(input))
    }
}

/// A proxy every request is routed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub server: String,
    pub port: u16,
}

/// Target, proxy, credentials and capabilities for issuing requests.
#[derive(Clone)]
pub struct Context {
    pub(crate) server: Option<String>,
    pub(crate) port: u16,
    pub(crate) proxy: Option<Proxy>,
    pub(crate) encoder: Option<Arc<dyn Base64Encoder>>,
    pub(crate) auth_token: Option<String>,
    pub(crate) body_reader: Option<Arc<dyn BodyReader>>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            server: None,
            port: UNPARSED_PORT,
            proxy: None,
            encoder: None,
            auth_token: None,
            body_reader: None,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("proxy", &self.proxy)
            .field("encoder", &self.encoder.is_some())
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("body_reader", &self.body_reader.is_some())
            .finish()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context targeting `url`, returning it with the resource path.
    pub fn for_url(url: &str) -> Result<(Self, String), Error> {
        let mut ctx = Self::new();
        let path = ctx.parse_url(url)?;
        Ok((ctx, path))
    }

    /// Parse `url` and make its host and port this context's target.
    ///
    /// Returns the resource path (without the leading `/`). On failure the
    /// context is left untouched.
    pub fn parse_url(&mut self, url: &str) -> Result<String, Error> {
        let parsed = url::parse(url)?;
        self.server = Some(parsed.host);
        self.port = parsed.port;
        Ok(parsed.path)
    }

    /// Route every request through the proxy named by `proxy_url`.
    ///
    /// The path component of `proxy_url` is ignored. The target server and
    /// port are not affected.
    pub fn set_proxy(&mut self, proxy_url: &str) -> Result<(), Error> {
        let parsed = url::parse(proxy_url)?;
        self.proxy = Some(Proxy {
            server: parsed.host,
            port: parsed.port,
        });
        Ok(())
    }

    /// Stop routing through a proxy.
    pub fn clear_proxy(&mut self) {
        self.proxy = None;
    }

    /// Install the encoder used by `set_basic_auth`.
    pub fn set_base64_encoder(&mut self, encoder: impl Base64Encoder + 'static) {
        self.encoder = Some(Arc::new(encoder));
    }

    /// Derive and store the Basic-Auth token for `user` and `pass`.
    ///
    /// Requires a Base64 encoder to have been installed first.
    pub fn set_basic_auth(&mut self, user: &str, pass: &str) -> Result<(), Error> {
        let encoder = self
            .encoder
            .as_ref()
            .ok_or(Error::NullArgument("base64 encoder"))?;
        let token = encoder
            .encode(&format!("{user}:{pass}"))
            .ok_or(Error::Encoder)?;
        self.auth_token = Some(token);
        Ok(())
    }

    /// Install a reader for bodies of unknown length, or remove it with `None`.
    pub fn set_body_reader(&mut self, reader: Option<Arc<dyn BodyReader>>) {
        self.body_reader = reader;
    }

    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn proxy(&self) -> Option<&Proxy> {
        self.proxy.as_ref()
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// The proxy requests are routed through, if one is active.
    ///
    /// A proxy with port 0 is treated as not configured.
    pub(crate) fn active_proxy(&self) -> Option<&Proxy> {
        self.proxy.as_ref().filter(|p| p.port != 0)
    }

    /// Target host, falling back to `FALLBACK_SERVER` before any parse.
    pub(crate) fn server_or_fallback(&self) -> &str {
        self.server.as_deref().unwrap_or(FALLBACK_SERVER)
    }
}
