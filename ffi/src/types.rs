//! C-compatible types and capability adapters for the FFI boundary.
//!
//! # Design
//! The context is opaque to C. The two injected capabilities arrive as plain
//! C function pointers and are wrapped here in types implementing the core
//! traits, so `lib.rs` only deals with argument checking and result codes.

use std::ffi::{CStr, CString};
use std::io::{self, ErrorKind, Read};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

use minihttp_core::reader::page_size;
use minihttp_core::{Base64Encoder, BodyReader, Context};
use tracing::debug;

/// Opaque handle to a `Context`. C callers receive a pointer to this and
/// pass it back into every FFI function.
pub struct FfiContext {
    pub(crate) inner: Context,
}

/// Negative result codes. Any non-negative result is an HTTP status.
///
/// An encoder failure reports `OutOfMemory`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Host = -1,
    Socket = -2,
    Connect = -3,
    WriteHeader = -4,
    WriteBody = -5,
    ReadHeader = -6,
    ParseStatus = -7,
    NullArgument = -8,
    ReadUnknownLength = -9,
    OutOfMemory = -10,
    ShortBody = -11,
    UrlScheme = -12,
    UrlPort = -13,
    Panic = -14,
}

impl FfiErrorCode {
    pub(crate) fn code(self) -> c_int {
        self as c_int
    }
}

/// Base64 capability supplied by C.
///
/// Encodes the NUL-terminated `input` and stores a `malloc`-allocated,
/// NUL-terminated result in `*output`. Returns 0 on success. The library
/// releases `*output` with `free`.
pub type FfiBase64Fn = extern "C" fn(input: *const c_char, output: *mut *mut c_char) -> c_int;

/// Streaming body capability supplied by C.
///
/// Called once per chunk of a body of unknown length, in order. Returning
/// non-zero stops the transfer and the call fails with `ReadUnknownLength`.
pub type FfiBodyChunkFn =
    extern "C" fn(data: *const u8, length: usize, user_data: *mut c_void) -> c_int;

pub(crate) struct CBase64 {
    pub(crate) func: FfiBase64Fn,
}

impl Base64Encoder for CBase64 {
    fn encode(&self, input: &str) -> Option<String> {
        let input = CString::new(input).ok()?;
        let mut output: *mut c_char = ptr::null_mut();
        let rc = (self.func)(input.as_ptr(), &mut output);
        if output.is_null() {
            return None;
        }
        let encoded = unsafe { CStr::from_ptr(output) }
            .to_str()
            .ok()
            .map(str::to_string);
        unsafe { libc::free(output.cast()) };
        if rc != 0 {
            debug!(rc, "base64 callback reported failure");
            return None;
        }
        encoded
    }
}

/// Feeds the connection to a C callback chunk by chunk.
pub(crate) struct CBodyReader {
    pub(crate) func: FfiBodyChunkFn,
    pub(crate) user_data: *mut c_void,
}

// The caller guarantees `user_data` may be used from whichever thread
// issues the request.
unsafe impl Send for CBodyReader {}
unsafe impl Sync for CBodyReader {}

impl BodyReader for CBodyReader {
    fn read_body(&self, body: &mut dyn Read) -> io::Result<()> {
        let mut chunk = vec![0u8; page_size()];
        loop {
            let n = match body.read(&mut chunk) {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            let rc = (self.func)(chunk.as_ptr(), n, self.user_data);
            if rc != 0 {
                return Err(io::Error::other(format!(
                    "body callback stopped the transfer ({rc})"
                )));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

/// Hand `data` to C as a heap buffer; null when empty.
///
/// Released with `minihttp_free_buffer(ptr, len)`.
pub(crate) fn buffer_into_raw(data: Vec<u8>) -> *mut u8 {
    if data.is_empty() {
        return ptr::null_mut();
    }
    Box::into_raw(data.into_boxed_slice()).cast()
}

/// Hand an optional string to C; null when absent or not representable.
pub(crate) fn string_into_raw(s: Option<String>) -> *mut c_char {
    s.and_then(|s| CString::new(s).ok())
        .map_or(ptr::null_mut(), CString::into_raw)
}

/// Store `value` through `out` unless the caller passed null.
pub(crate) fn write_out<T>(out: *mut T, value: T) {
    if !out.is_null() {
        unsafe { out.write(value) };
    }
}
