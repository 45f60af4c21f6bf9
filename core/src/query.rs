//! One request/response exchange up to and including the status line.
//!
//! # Design
//! `query` resolves, connects, sends the rendered request and parses the
//! status line. With `QueryMode::KeepOpen` the live connection is handed
//! back as an owned `Connection` so the caller can read headers and body;
//! the socket closes when that value is dropped. Every failure path drops
//! the stream before returning, so no socket outlives an error.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, trace, warn};

use crate::context::Context;
use crate::error::Error;
use crate::http::{Request, Status};
use crate::reader::read_status_line;

/// What happens to the socket once the status line is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Close right after the status line.
    Close,
    /// Hand the connection to the caller.
    KeepOpen,
}

/// A connection positioned just after the status line.
///
/// Reads go through the buffer that was used for the status line, so no
/// byte the server sent is lost. Dropping the value closes the socket.
#[derive(Debug)]
pub struct Connection {
    reader: BufReader<TcpStream>,
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl BufRead for Connection {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.reader.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt)
    }
}

/// Execute `request` against the context's target (or its proxy).
///
/// Returns the parsed status, plus the open connection in `KeepOpen` mode.
pub fn query(
    ctx: &Context,
    request: &Request,
    mode: QueryMode,
) -> Result<(Status, Option<Connection>), Error> {
    let (host, port) = match ctx.active_proxy() {
        Some(proxy) => (proxy.server.as_str(), proxy.port),
        None => (ctx.server_or_fallback(), ctx.port),
    };

    trace!(host, port, "resolving");
    let addr = resolve(host, port)?;

    trace!(%addr, "connecting");
    let mut stream = connect(addr)?;

    let head = request.head_block(ctx);
    debug!(request = %head, "sending request header");
    stream.write_all(head.as_bytes()).map_err(|e| {
        warn!(error = %e, %addr, "header write failed");
        Error::WriteHeader(e)
    })?;

    if let Some(body) = request.body.as_deref().filter(|b| !b.is_empty()) {
        trace!(len = body.len(), "sending request body");
        stream.write_all(body).map_err(|e| {
            warn!(error = %e, %addr, "body write failed");
            Error::WriteBody(e)
        })?;
    }

    let mut reader = BufReader::new(stream);
    let status = read_status_line(&mut reader)?;
    debug!(%status, method = %request.method, path = %request.path, "status received");

    match mode {
        QueryMode::KeepOpen => Ok((status, Some(Connection { reader }))),
        QueryMode::Close => Ok((status, None)),
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, Error> {
    let host_error = |source| Error::Host {
        host: host.to_string(),
        source,
    };
    (host, port)
        .to_socket_addrs()
        .map_err(host_error)?
        .next()
        .ok_or_else(|| host_error(io::Error::new(io::ErrorKind::NotFound, "no address found")))
}

fn connect(addr: SocketAddr) -> Result<TcpStream, Error> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(Error::Socket)?;
    socket
        .connect(&SockAddr::from(addr))
        .map_err(|source| Error::Connect { addr, source })?;
    Ok(socket.into())
}
