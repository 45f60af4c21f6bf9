//! Line and body readers over a live connection.
//!
//! # Design
//! All readers take a `BufRead`/`Read` rather than a socket so they run the
//! same against a `TcpStream` and an in-memory cursor. The line reader works
//! through `fill_buf`/`consume`, which keeps header parsing to one syscall
//! per buffer refill while still never consuming a byte past the line it
//! returns. Bytes left in the buffer after the header block are the start of
//! the body and are read by the body readers through the same `BufRead`.

use std::io::{self, BufRead, ErrorKind, Read};
use std::sync::OnceLock;

use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::http::{parse_status_line, ResponseHead, Status};

/// Longest status or header line read in one piece, in bytes.
pub const MAX_LINE: usize = 511;

const FALLBACK_PAGE_SIZE: usize = 4096;

/// Read one line into `line`, consuming at most `max` bytes.
///
/// Carriage returns are dropped and the terminating line feed is consumed but
/// not stored. A line longer than `max` is returned cut; the rest of it is
/// what the next call sees. Returns the number of bytes consumed from
/// `reader`, so an empty line still reports a non-zero count.
///
/// Fails with `UnexpectedEof` if the peer closes before a line feed.
pub fn read_line<R: BufRead + ?Sized>(
    reader: &mut R,
    line: &mut Vec<u8>,
    max: usize,
) -> io::Result<usize> {
    line.clear();
    let mut consumed = 0;
    while consumed < max {
        let available = match reader.fill_buf() {
            Ok([]) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "connection closed before end of line",
                ))
            }
            Ok(buf) => buf,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        let window = &available[..available.len().min(max - consumed)];
        let mut used = 0;
        let mut done = false;
        for &byte in window {
            used += 1;
            match byte {
                b'\r' => {}
                b'\n' => {
                    done = true;
                    break;
                }
                _ => line.push(byte),
            }
        }
        reader.consume(used);
        consumed += used;
        if done {
            break;
        }
    }
    Ok(consumed)
}

/// Read and parse the status line.
pub fn read_status_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<Status, Error> {
    let mut line = Vec::new();
    read_line(reader, &mut line, MAX_LINE).map_err(Error::ReadHeader)?;
    let line = String::from_utf8_lossy(&line);
    trace!(status_line = %line);
    parse_status_line(&line)
}

/// Read header lines up to the first empty line, keeping the two fields
/// this library interprets.
///
/// Field names match case-insensitively. A later occurrence of a field
/// replaces an earlier one. Nothing after the empty line is consumed.
pub fn read_response_head<R: BufRead + ?Sized>(reader: &mut R) -> Result<ResponseHead, Error> {
    let mut head = ResponseHead::default();
    let mut line = Vec::new();
    loop {
        read_line(reader, &mut line, MAX_LINE).map_err(Error::ReadHeader)?;
        if line.is_empty() {
            break;
        }

        let name_end = line.iter().position(|&b| b == b':').unwrap_or(line.len());
        line[..name_end].make_ascii_lowercase();
        let header = String::from_utf8_lossy(&line);
        debug!(header = %header, "response header");

        if let Some(value) = header.strip_prefix("content-length:") {
            if let Some(length) = leading_integer(value) {
                head.content_length = u64::try_from(length).ok();
            }
        } else if let Some(value) = header.strip_prefix("content-type:") {
            if let Some(token) = value.split_whitespace().next() {
                head.content_type = Some(token.to_string());
            }
        }
    }
    Ok(head)
}

/// Fill `buf` completely, retrying short reads.
///
/// Returns `Err(received)` if the peer closes or a read fails first.
pub fn read_fixed<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<usize, usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(filled),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                warn!(error = %e, filled, expected = buf.len(), "body read failed");
                return Err(filled);
            }
        }
    }
    Ok(filled)
}

/// Read until the peer closes the connection, growing the buffer one memory
/// page at a time.
///
/// A connection reset is an ordinary end of data. Any other read error, or
/// a buffer that cannot grow, discards what was read.
pub fn read_to_close<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>, Error> {
    let page = page_size();
    let mut buf: Vec<u8> = Vec::new();
    let mut len = 0;
    loop {
        if len == buf.len() {
            grow(&mut buf, page)?;
        }

        let to_read = page - len % page;
        match reader.read(&mut buf[len..len + to_read]) {
            Ok(0) => break,
            Ok(n) => len += n,
            Err(e) if e.kind() == ErrorKind::ConnectionReset => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                warn!(error = %e, discarded = len, "read until close failed");
                return Err(Error::ReadUnknownLength(e));
            }
        }
    }
    buf.truncate(len);
    Ok(buf)
}

/// Extend `buf` by `by` zeroed bytes.
///
/// Failing to grow is a failed unknown-length read, like any read error.
fn grow(buf: &mut Vec<u8>, by: usize) -> Result<(), Error> {
    if let Err(e) = buf.try_reserve_exact(by) {
        warn!(error = %e, held = buf.len(), "cannot grow body buffer");
        return Err(Error::ReadUnknownLength(io::Error::new(
            ErrorKind::OutOfMemory,
            e,
        )));
    }
    buf.resize(buf.len() + by, 0);
    Ok(())
}

/// Memory page size, queried once.
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        let size = system_page_size().unwrap_or(FALLBACK_PAGE_SIZE);
        debug!(page_size = size);
        size
    })
}

#[cfg(unix)]
fn system_page_size() -> Option<usize> {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    usize::try_from(size).ok().filter(|&s| s > 0)
}

#[cfg(not(unix))]
fn system_page_size() -> Option<usize> {
    None
}

/// Leading decimal integer after optional whitespace and sign.
fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with(['+', '-']));
    let digits = s[sign_len..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}
