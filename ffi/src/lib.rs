//! C-ABI wrapper around `minihttp-core`.
//!
//! # Overview
//! Exposes the context setters and the five verbs through `extern "C"`
//! functions so C programs can use the client without touching Rust types.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary; a caught panic returns
//!   `FfiErrorCode::Panic`.
//! - Verbs return one `int`: the HTTP status when the exchange got that far,
//!   otherwise a negative `FfiErrorCode`. Setters return 0 or a negative code.
//! - Bodies and strings handed out are owned by the caller and must be
//!   released with `minihttp_free_buffer` / `minihttp_free_string`.
//! - Output pointers may be null when the caller does not want that value.

pub mod types;

use std::borrow::Cow;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;

use minihttp_core::{Context, Error, Response, Status};

use types::*;

/// Run `f`, turning a panic into `FfiErrorCode::Panic`.
fn guard(f: impl FnOnce() -> c_int) -> c_int {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or(FfiErrorCode::Panic.code())
}

fn status_code(result: Result<Status, Error>) -> c_int {
    match result {
        Ok(status) => c_int::from(status.as_u16()),
        Err(e) => e.code(),
    }
}

fn unit_code(result: Result<(), Error>) -> c_int {
    result.map_or_else(|e| e.code(), |()| 0)
}

/// Borrow a C string argument.
fn str_arg<'a>(ptr: *const c_char, name: &'static str) -> Result<Cow<'a, str>, Error> {
    if ptr.is_null() {
        return Err(Error::NullArgument(name));
    }
    Ok(unsafe { CStr::from_ptr(ptr) }.to_string_lossy())
}

/// Borrow an optional C string argument; null means absent.
fn opt_str_arg<'a>(ptr: *const c_char) -> Option<Cow<'a, str>> {
    (!ptr.is_null()).then(|| unsafe { CStr::from_ptr(ptr) }.to_string_lossy())
}

/// Borrow a data buffer; null is only accepted together with length 0.
fn bytes_arg<'a>(data: *const u8, length: usize) -> Result<&'a [u8], Error> {
    match (data.is_null(), length) {
        (true, 0) => Ok(&[]),
        (true, _) => Err(Error::NullArgument("data")),
        (false, _) => Ok(unsafe { std::slice::from_raw_parts(data, length) }),
    }
}

fn context<'a>(ctx: *const FfiContext) -> Result<&'a Context, Error> {
    if ctx.is_null() {
        return Err(Error::NullArgument("context"));
    }
    Ok(unsafe { &(*ctx).inner })
}

fn context_mut<'a>(ctx: *mut FfiContext) -> Result<&'a mut Context, Error> {
    if ctx.is_null() {
        return Err(Error::NullArgument("context"));
    }
    Ok(unsafe { &mut (*ctx).inner })
}

/// Hand a body to the caller through the two output pointers.
fn deliver_body(body: Vec<u8>, data: *mut *mut u8, length: *mut usize) {
    if data.is_null() {
        write_out(length, 0);
        return;
    }
    write_out(length, body.len());
    write_out(data, buffer_into_raw(body));
}

fn deliver_string(value: Option<String>, out: *mut *mut c_char) {
    if !out.is_null() {
        write_out(out, string_into_raw(value));
    }
}

/// Reset output pointers so the caller never sees stale values.
fn clear_body_outputs(data: *mut *mut u8, length: *mut usize, content_type: *mut *mut c_char) {
    write_out(data, ptr::null_mut());
    write_out(length, 0);
    write_out(content_type, ptr::null_mut());
}

/// Map a GET/POST outcome onto the output pointers and the result code.
fn deliver_response(
    result: Result<Response, Error>,
    data: *mut *mut u8,
    length: *mut usize,
    content_type: *mut *mut c_char,
) -> c_int {
    match result {
        Ok(response) => {
            let status = c_int::from(response.status.as_u16());
            deliver_body(response.body, data, length);
            deliver_string(response.content_type, content_type);
            status
        }
        Err(Error::ShortBody {
            partial,
            content_type: declared_type,
            ..
        }) => {
            deliver_body(partial, data, length);
            deliver_string(declared_type, content_type);
            FfiErrorCode::ShortBody.code()
        }
        Err(e) => e.code(),
    }
}

// ---------------------------------------------------------------------------
// Context lifecycle
// ---------------------------------------------------------------------------

/// Create a context with no target, no proxy and no credentials.
///
/// The caller must free the returned pointer with `minihttp_context_free`.
/// Returns null only if an internal panic occurs.
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_context_new() -> *mut FfiContext {
    catch_unwind(|| {
        Box::into_raw(Box::new(FfiContext {
            inner: Context::new(),
        }))
    })
    .unwrap_or(ptr::null_mut())
}

/// Free a context created by `minihttp_context_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_context_free(ctx: *mut FfiContext) {
    if !ctx.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(ctx) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Parse `url` and make its host and port the context's target.
///
/// On success returns 0 and, if `path` is not null, stores the resource path
/// (to be freed with `minihttp_free_string`). `*path` must be null or a
/// string returned by this library; that previous string is freed before
/// the new one is stored. On failure neither the context nor `*path` is
/// touched.
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_parse_url(
    ctx: *mut FfiContext,
    url: *const c_char,
    path: *mut *mut c_char,
) -> c_int {
    guard(|| {
        let result = (|| -> Result<String, Error> {
            let ctx = context_mut(ctx)?;
            let url = str_arg(url, "url")?;
            ctx.parse_url(&url)
        })();
        match result {
            Ok(resource) => {
                if !path.is_null() {
                    minihttp_free_string(unsafe { path.read() });
                }
                deliver_string(Some(resource), path);
                0
            }
            Err(e) => e.code(),
        }
    })
}

/// Route requests through the proxy named by `proxy_url`; null removes it.
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_set_proxy(ctx: *mut FfiContext, proxy_url: *const c_char) -> c_int {
    guard(|| {
        unit_code((|| -> Result<(), Error> {
            let ctx = context_mut(ctx)?;
            match opt_str_arg(proxy_url) {
                Some(url) => ctx.set_proxy(&url),
                None => {
                    ctx.clear_proxy();
                    Ok(())
                }
            }
        })())
    })
}

/// Install the Base64 function used by `minihttp_set_basic_auth`.
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_set_base64_encoder(
    ctx: *mut FfiContext,
    encoder: Option<FfiBase64Fn>,
) -> c_int {
    guard(|| {
        unit_code((|| -> Result<(), Error> {
            let ctx = context_mut(ctx)?;
            let func = encoder.ok_or(Error::NullArgument("encoder"))?;
            ctx.set_base64_encoder(CBase64 { func });
            Ok(())
        })())
    })
}

/// Derive and store the Basic-Auth token for `user` and `pass`.
///
/// Requires an encoder; returns `NullArgument` without one and
/// `OutOfMemory` if the encoder fails. The previous token is kept on failure.
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_set_basic_auth(
    ctx: *mut FfiContext,
    user: *const c_char,
    pass: *const c_char,
) -> c_int {
    guard(|| {
        unit_code((|| -> Result<(), Error> {
            let ctx = context_mut(ctx)?;
            let user = str_arg(user, "user")?;
            let pass = str_arg(pass, "pass")?;
            ctx.set_basic_auth(&user, &pass)
        })())
    })
}

/// Install a chunk callback for bodies of unknown length; null removes it.
///
/// `user_data` is passed through to every call unchanged.
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_set_body_reader(
    ctx: *mut FfiContext,
    reader: Option<FfiBodyChunkFn>,
    user_data: *mut c_void,
) -> c_int {
    guard(|| {
        unit_code((|| -> Result<(), Error> {
            let ctx = context_mut(ctx)?;
            let reader = reader.map(|func| {
                Arc::new(CBodyReader { func, user_data }) as Arc<dyn minihttp_core::BodyReader>
            });
            ctx.set_body_reader(reader);
            Ok(())
        })())
    })
}

// ---------------------------------------------------------------------------
// Verbs
// ---------------------------------------------------------------------------

/// Store `length` bytes at `data` under `path`.
///
/// `content_type` may be null. Returns the HTTP status or a negative code.
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_put(
    ctx: *const FfiContext,
    path: *const c_char,
    data: *const u8,
    length: usize,
    overwrite: bool,
    content_type: *const c_char,
) -> c_int {
    guard(|| {
        status_code((|| -> Result<Status, Error> {
            let ctx = context(ctx)?;
            let path = str_arg(path, "path")?;
            let data = bytes_arg(data, length)?;
            let content_type = opt_str_arg(content_type);
            ctx.put(&path, data, overwrite, content_type.as_deref())
        })())
    })
}

/// Fetch the resource at `path`.
///
/// On status 200 the body, its length and its type (null if the server sent
/// none) are stored through the output pointers. On `ShortBody` the bytes
/// that did arrive and the declared type are stored. Returns the HTTP status
/// or a negative code.
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_get(
    ctx: *const FfiContext,
    path: *const c_char,
    data: *mut *mut u8,
    length: *mut usize,
    content_type: *mut *mut c_char,
) -> c_int {
    guard(|| {
        clear_body_outputs(data, length, content_type);
        let result = (|| -> Result<Response, Error> {
            let ctx = context(ctx)?;
            let path = str_arg(path, "path")?;
            ctx.get(&path)
        })();
        deliver_response(result, data, length, content_type)
    })
}

/// Fetch only the length and type of the resource at `path`.
///
/// `length` receives -1 when the server declared none.
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_head(
    ctx: *const FfiContext,
    path: *const c_char,
    length: *mut i64,
    content_type: *mut *mut c_char,
) -> c_int {
    guard(|| {
        write_out(length, -1);
        write_out(content_type, ptr::null_mut());
        let result = (|| -> Result<Response, Error> {
            let ctx = context(ctx)?;
            let path = str_arg(path, "path")?;
            ctx.head(&path)
        })();
        match result {
            Ok(response) => {
                let declared = response
                    .content_length
                    .and_then(|n| i64::try_from(n).ok())
                    .unwrap_or(-1);
                write_out(length, declared);
                deliver_string(response.content_type, content_type);
                c_int::from(response.status.as_u16())
            }
            Err(e) => e.code(),
        }
    })
}

/// Delete the resource at `path`. Returns the HTTP status or a negative code.
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_delete(ctx: *const FfiContext, path: *const c_char) -> c_int {
    guard(|| {
        status_code((|| -> Result<Status, Error> {
            let ctx = context(ctx)?;
            let path = str_arg(path, "path")?;
            ctx.delete(&path)
        })())
    })
}

/// Send `length` bytes at `data` to `path` and read the answer.
///
/// The request body must not be empty. Output pointers behave as for
/// `minihttp_get`, except that a short body is not handed back.
#[allow(clippy::too_many_arguments)]
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_post(
    ctx: *const FfiContext,
    path: *const c_char,
    data: *const u8,
    length: usize,
    content_type: *const c_char,
    out_data: *mut *mut u8,
    out_length: *mut usize,
    out_content_type: *mut *mut c_char,
) -> c_int {
    guard(|| {
        clear_body_outputs(out_data, out_length, out_content_type);
        let result = (|| -> Result<Response, Error> {
            let ctx = context(ctx)?;
            let path = str_arg(path, "path")?;
            let data = bytes_arg(data, length)?;
            let content_type = opt_str_arg(content_type);
            ctx.post(&path, data, content_type.as_deref())
        })();
        deliver_response(result, out_data, out_length, out_content_type)
    })
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a body returned by `minihttp_get` or `minihttp_post`.
/// `length` must be the length returned with it. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_free_buffer(data: *mut u8, length: usize) {
    if !data.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(data, length)) });
        });
    }
}

/// Free a string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn minihttp_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    use mock_server::scripted;

    fn ctx_for(url: &str) -> *mut FfiContext {
        let ctx = minihttp_context_new();
        let url = CString::new(url).unwrap();
        assert_eq!(minihttp_parse_url(ctx, url.as_ptr(), ptr::null_mut()), 0);
        ctx
    }

    fn take_string(s: *mut c_char) -> Option<String> {
        if s.is_null() {
            return None;
        }
        let value = unsafe { CStr::from_ptr(s) }.to_str().unwrap().to_string();
        minihttp_free_string(s);
        Some(value)
    }

    fn take_buffer(data: *mut u8, length: usize) -> Vec<u8> {
        if data.is_null() {
            return Vec::new();
        }
        let value = unsafe { std::slice::from_raw_parts(data, length) }.to_vec();
        minihttp_free_buffer(data, length);
        value
    }

    extern "C" fn fixed_encoder(_input: *const c_char, output: *mut *mut c_char) -> c_int {
        unsafe { *output = libc::strdup(c"dXNlcjpwYXNz".as_ptr()) };
        0
    }

    extern "C" fn failing_encoder(_input: *const c_char, output: *mut *mut c_char) -> c_int {
        unsafe { *output = ptr::null_mut() };
        -1
    }

    extern "C" fn collect_chunks(data: *const u8, length: usize, user_data: *mut c_void) -> c_int {
        let sink = unsafe { &mut *user_data.cast::<Vec<u8>>() };
        sink.extend_from_slice(unsafe { std::slice::from_raw_parts(data, length) });
        0
    }

    extern "C" fn refuse_chunks(_data: *const u8, _length: usize, _user_data: *mut c_void) -> c_int {
        1
    }

    // --- lifecycle and configuration ---

    #[test]
    fn context_new_and_free() {
        let ctx = minihttp_context_new();
        assert!(!ctx.is_null());
        minihttp_context_free(ctx);
    }

    #[test]
    fn context_free_null_is_safe() {
        minihttp_context_free(ptr::null_mut());
    }

    #[test]
    fn parse_url_returns_path() {
        let ctx = minihttp_context_new();
        let url = CString::new("http://example.com:8080/dir/file").unwrap();
        let mut path = ptr::null_mut();
        assert_eq!(minihttp_parse_url(ctx, url.as_ptr(), &mut path), 0);
        assert_eq!(take_string(path).as_deref(), Some("dir/file"));

        let inner = unsafe { &(*ctx).inner };
        assert_eq!(inner.server(), Some("example.com"));
        assert_eq!(inner.port(), 8080);
        minihttp_context_free(ctx);
    }

    #[test]
    fn parse_url_errors_leave_output_untouched() {
        let ctx = minihttp_context_new();
        let previous = CString::new("previous").unwrap().into_raw();
        let mut path = previous;

        let bad_scheme = CString::new("ftp://example.com/x").unwrap();
        assert_eq!(minihttp_parse_url(ctx, bad_scheme.as_ptr(), &mut path), -12);
        assert_eq!(path, previous);
        let bad_port = CString::new("http://x:y/").unwrap();
        assert_eq!(minihttp_parse_url(ctx, bad_port.as_ptr(), &mut path), -13);
        assert_eq!(minihttp_parse_url(ctx, ptr::null(), &mut path), -8);
        assert_eq!(minihttp_parse_url(ptr::null_mut(), bad_scheme.as_ptr(), &mut path), -8);
        assert_eq!(path, previous);
        assert_eq!(unsafe { CStr::from_ptr(path) }.to_str().unwrap(), "previous");
        assert_eq!(unsafe { &(*ctx).inner }.server(), None);

        minihttp_free_string(path);
        minihttp_context_free(ctx);
    }

    #[test]
    fn parse_url_replaces_previous_path() {
        let ctx = minihttp_context_new();
        let mut path = ptr::null_mut();
        let first = CString::new("http://example.com/first").unwrap();
        assert_eq!(minihttp_parse_url(ctx, first.as_ptr(), &mut path), 0);

        // The previous string is released by the library, not the caller.
        let second = CString::new("http://example.com/second").unwrap();
        assert_eq!(minihttp_parse_url(ctx, second.as_ptr(), &mut path), 0);
        assert_eq!(take_string(path).as_deref(), Some("second"));
        minihttp_context_free(ctx);
    }

    #[test]
    fn set_and_clear_proxy() {
        let ctx = minihttp_context_new();
        let proxy = CString::new("http://proxy:3128/").unwrap();
        assert_eq!(minihttp_set_proxy(ctx, proxy.as_ptr()), 0);
        assert_eq!(unsafe { &(*ctx).inner }.proxy().map(|p| p.port), Some(3128));

        assert_eq!(minihttp_set_proxy(ctx, ptr::null()), 0);
        assert!(unsafe { &(*ctx).inner }.proxy().is_none());
        minihttp_context_free(ctx);
    }

    #[test]
    fn basic_auth_needs_encoder() {
        let ctx = minihttp_context_new();
        let user = CString::new("user").unwrap();
        let pass = CString::new("pass").unwrap();
        assert_eq!(minihttp_set_basic_auth(ctx, user.as_ptr(), pass.as_ptr()), -8);
        assert_eq!(minihttp_set_base64_encoder(ctx, None), -8);

        assert_eq!(minihttp_set_base64_encoder(ctx, Some(fixed_encoder)), 0);
        assert_eq!(minihttp_set_basic_auth(ctx, user.as_ptr(), pass.as_ptr()), 0);
        assert_eq!(unsafe { &(*ctx).inner }.auth_token(), Some("dXNlcjpwYXNz"));
        minihttp_context_free(ctx);
    }

    #[test]
    fn failing_encoder_keeps_token() {
        let ctx = minihttp_context_new();
        let user = CString::new("user").unwrap();
        let pass = CString::new("pass").unwrap();
        minihttp_set_base64_encoder(ctx, Some(fixed_encoder));
        minihttp_set_basic_auth(ctx, user.as_ptr(), pass.as_ptr());

        minihttp_set_base64_encoder(ctx, Some(failing_encoder));
        assert_eq!(
            minihttp_set_basic_auth(ctx, user.as_ptr(), pass.as_ptr()),
            FfiErrorCode::OutOfMemory.code()
        );
        assert_eq!(unsafe { &(*ctx).inner }.auth_token(), Some("dXNlcjpwYXNz"));
        minihttp_context_free(ctx);
    }

    #[test]
    fn error_codes_match_core() {
        use std::io;
        let io_err = || io::Error::other("x");
        let cases = [
            (Error::Socket(io_err()), FfiErrorCode::Socket),
            (Error::WriteHeader(io_err()), FfiErrorCode::WriteHeader),
            (Error::WriteBody(io_err()), FfiErrorCode::WriteBody),
            (Error::ReadHeader(io_err()), FfiErrorCode::ReadHeader),
            (Error::ParseStatus { line: String::new() }, FfiErrorCode::ParseStatus),
            (Error::NullArgument("x"), FfiErrorCode::NullArgument),
            (Error::ReadUnknownLength(io_err()), FfiErrorCode::ReadUnknownLength),
            (Error::OutOfMemory { size: 1 }, FfiErrorCode::OutOfMemory),
            (Error::Encoder, FfiErrorCode::OutOfMemory),
            (Error::UrlScheme(String::new()), FfiErrorCode::UrlScheme),
            (Error::UrlPort(String::new()), FfiErrorCode::UrlPort),
        ];
        for (err, expected) in cases {
            assert_eq!(err.code(), expected.code(), "{err}");
        }
    }

    // --- verbs against a scripted server ---

    #[test]
    fn get_delivers_body_and_type() {
        let (addr, server) = scripted::spawn(
            "HTTP/1.0 200 OK\r\nContent-Length: 5\r\nContent-Type: text/plain\r\n\r\nhello",
        );
        let ctx = ctx_for(&format!("http://{addr}/"));
        let path = CString::new("greeting").unwrap();

        let (mut data, mut length, mut content_type) = (ptr::null_mut(), 0, ptr::null_mut());
        let rc = minihttp_get(ctx, path.as_ptr(), &mut data, &mut length, &mut content_type);
        assert_eq!(rc, 200);
        assert_eq!(take_buffer(data, length), b"hello");
        assert_eq!(take_string(content_type).as_deref(), Some("text/plain"));

        server.join().unwrap();
        minihttp_context_free(ctx);
    }

    #[test]
    fn get_short_body_hands_back_partial() {
        let (addr, server) = scripted::spawn(
            "HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 10\r\n\r\nabc",
        );
        let ctx = ctx_for(&format!("http://{addr}/"));
        let path = CString::new("x").unwrap();

        let (mut data, mut length, mut content_type) = (ptr::null_mut(), 0, ptr::null_mut());
        let rc = minihttp_get(ctx, path.as_ptr(), &mut data, &mut length, &mut content_type);
        assert_eq!(rc, FfiErrorCode::ShortBody.code());
        assert_eq!(take_buffer(data, length), b"abc");
        assert_eq!(take_string(content_type).as_deref(), Some("text/plain"));

        server.join().unwrap();
        minihttp_context_free(ctx);
    }

    #[test]
    fn head_reports_missing_length_as_minus_one() {
        let (addr, server) = scripted::spawn("HTTP/1.0 200 OK\r\nContent-Type: text/html\r\n\r\n");
        let ctx = ctx_for(&format!("http://{addr}/"));
        let path = CString::new("page").unwrap();

        let (mut length, mut content_type) = (0i64, ptr::null_mut());
        let rc = minihttp_head(ctx, path.as_ptr(), &mut length, &mut content_type);
        assert_eq!(rc, 200);
        assert_eq!(length, -1);
        assert_eq!(take_string(content_type).as_deref(), Some("text/html"));

        server.join().unwrap();
        minihttp_context_free(ctx);
    }

    #[test]
    fn put_and_delete_return_status() {
        let (addr, server) = scripted::spawn("HTTP/1.0 201 Created\r\n\r\n");
        let ctx = ctx_for(&format!("http://{addr}/"));
        let path = CString::new("file").unwrap();
        let ty = CString::new("text/plain").unwrap();
        let rc = minihttp_put(ctx, path.as_ptr(), b"data".as_ptr(), 4, true, ty.as_ptr());
        assert_eq!(rc, 201);
        let request = String::from_utf8(server.join().unwrap()).unwrap();
        assert!(request.contains("Control: overwrite=1\r\n"));
        assert!(request.ends_with("\r\n\r\ndata"));

        let (addr, server) = scripted::spawn("HTTP/1.0 404 Not Found\r\n\r\n");
        let mut path_out = ptr::null_mut();
        let url = CString::new(format!("http://{addr}/file")).unwrap();
        minihttp_parse_url(ctx, url.as_ptr(), &mut path_out);
        let rc = minihttp_delete(ctx, path_out);
        assert_eq!(rc, 404);
        minihttp_free_string(path_out);
        server.join().unwrap();
        minihttp_context_free(ctx);
    }

    #[test]
    fn body_reader_receives_chunks() {
        let (addr, server) = scripted::spawn("HTTP/1.0 200 OK\r\n\r\nstreamed body");
        let ctx = ctx_for(&format!("http://{addr}/"));
        let mut sink: Vec<u8> = Vec::new();
        let user_data = (&mut sink as *mut Vec<u8>).cast::<c_void>();
        assert_eq!(minihttp_set_body_reader(ctx, Some(collect_chunks), user_data), 0);

        let path = CString::new("feed").unwrap();
        let (mut data, mut length) = (ptr::null_mut(), 0);
        let rc = minihttp_get(ctx, path.as_ptr(), &mut data, &mut length, ptr::null_mut());
        assert_eq!(rc, 200);
        assert!(data.is_null());
        assert_eq!(length, 0);
        assert_eq!(sink, b"streamed body");

        server.join().unwrap();
        minihttp_context_free(ctx);
    }

    #[test]
    fn body_reader_can_abort() {
        let (addr, server) = scripted::spawn("HTTP/1.0 200 OK\r\n\r\nunwanted");
        let ctx = ctx_for(&format!("http://{addr}/"));
        minihttp_set_body_reader(ctx, Some(refuse_chunks), ptr::null_mut());

        let path = CString::new("feed").unwrap();
        let rc = minihttp_get(ctx, path.as_ptr(), ptr::null_mut(), ptr::null_mut(), ptr::null_mut());
        assert_eq!(rc, FfiErrorCode::ReadUnknownLength.code());

        server.join().unwrap();
        minihttp_context_free(ctx);
    }

    #[test]
    fn post_echo_and_empty_body() {
        let (addr, server) = scripted::spawn("HTTP/1.0 200 OK\r\nContent-Length: 2\r\n\r\nok");
        let ctx = ctx_for(&format!("http://{addr}/"));
        let path = CString::new("form").unwrap();

        let rc = minihttp_post(
            ctx,
            path.as_ptr(),
            ptr::null(),
            0,
            ptr::null(),
            ptr::null_mut(),
            ptr::null_mut(),
            ptr::null_mut(),
        );
        assert_eq!(rc, FfiErrorCode::NullArgument.code());

        let (mut data, mut length) = (ptr::null_mut(), 0);
        let rc = minihttp_post(
            ctx,
            path.as_ptr(),
            b"q=1".as_ptr(),
            3,
            ptr::null(),
            &mut data,
            &mut length,
            ptr::null_mut(),
        );
        assert_eq!(rc, 200);
        assert_eq!(take_buffer(data, length), b"ok");

        server.join().unwrap();
        minihttp_context_free(ctx);
    }

    #[test]
    fn null_data_with_length_is_rejected() {
        let ctx = ctx_for("http://127.0.0.1:9/");
        let path = CString::new("x").unwrap();
        let rc = minihttp_put(ctx, path.as_ptr(), ptr::null(), 3, false, ptr::null());
        assert_eq!(rc, FfiErrorCode::NullArgument.code());
        minihttp_context_free(ctx);
    }

    #[test]
    fn verbs_reject_null_context() {
        let path = CString::new("x").unwrap();
        assert_eq!(minihttp_delete(ptr::null(), path.as_ptr()), -8);
        assert_eq!(
            minihttp_get(ptr::null(), path.as_ptr(), ptr::null_mut(), ptr::null_mut(), ptr::null_mut()),
            -8
        );
    }

    // --- against the resource store ---

    fn start_store() -> std::net::SocketAddr {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run(listener).await
            })
            .unwrap();
        });
        addr
    }

    #[test]
    fn put_through_store_is_visible_to_ureq() {
        let addr = start_store();
        let url = format!("http://{addr}/notes/today");
        let ctx = minihttp_context_new();
        let c_url = CString::new(url.as_str()).unwrap();
        let mut path = ptr::null_mut();
        assert_eq!(minihttp_parse_url(ctx, c_url.as_ptr(), &mut path), 0);

        let ty = CString::new("text/plain").unwrap();
        let rc = minihttp_put(ctx, path, b"remember".as_ptr(), 8, false, ty.as_ptr());
        assert_eq!(rc, 201);

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        let mut response = agent.get(&url).call().unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.body_mut().read_to_string().unwrap(), "remember");

        assert_eq!(minihttp_delete(ctx, path), 200);
        assert_eq!(agent.get(&url).call().unwrap().status().as_u16(), 404);

        minihttp_free_string(path);
        minihttp_context_free(ctx);
    }

    #[test]
    fn free_functions_accept_null() {
        minihttp_free_buffer(ptr::null_mut(), 0);
        minihttp_free_string(ptr::null_mut());
    }
}
