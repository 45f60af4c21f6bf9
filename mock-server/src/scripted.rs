//! One-shot responder that replies with canned bytes.
//!
//! Reads a single request (header block plus a `Content-length` body, if
//! any), writes the scripted response verbatim and closes the connection.
//! The raw request is handed back so tests can check what went on the wire.

use std::{io, net::SocketAddr, thread};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};
use tracing::debug;

const HEADER_END: &[u8] = b"\r\n\r\n";

/// Serve exactly one request on `listener` and return its raw bytes.
pub async fn respond_once(listener: TcpListener, response: Vec<u8>) -> io::Result<Vec<u8>> {
    let (mut stream, peer) = listener.accept().await?;
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_len = loop {
        if let Some(pos) = find(&request, HEADER_END) {
            break pos + HEADER_END.len();
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(request);
        }
        request.extend_from_slice(&chunk[..n]);
    };

    let body_len = content_length(&request[..header_len]).unwrap_or(0);
    while request.len() < header_len + body_len {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..n]);
    }
    debug!(%peer, len = request.len(), "scripted request received");

    stream.write_all(&response).await?;
    stream.shutdown().await?;
    Ok(request)
}

/// Run `respond_once` on a fresh loopback port from a background thread.
///
/// Returns the bound address and a handle yielding the raw request.
pub fn spawn(response: impl Into<Vec<u8>>) -> (SocketAddr, thread::JoinHandle<Vec<u8>>) {
    let response = response.into();
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let handle = thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = TcpListener::from_std(std_listener)?;
            respond_once(listener, response).await
        })
        .unwrap()
    });
    (addr, handle)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn content_length(header: &[u8]) -> Option<usize> {
    String::from_utf8_lossy(header).lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}
