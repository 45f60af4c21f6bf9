//! The five verbs: PUT, GET, HEAD, DELETE and POST.
//!
//! # Design
//! Each verb is split into a `build_*` function that produces a `Request`
//! (pure, no I/O) and a method on `Context` that runs it through `query`
//! and assembles the result. The builders carry each verb's header policy,
//! so it can be checked without a server.
//!
//! Only a 200 status makes GET, HEAD and POST read the response head and
//! body. Any other status is returned as-is and the connection is closed.

use tracing::debug;

use crate::context::Context;
use crate::error::Error;
use crate::http::{truncate, Method, Request, Response, ResponseHead, Status, MAX_CONTENT_TYPE};
use crate::query::{query, Connection, QueryMode};
use crate::reader::{read_fixed, read_response_head, read_to_close};

/// Build a PUT storing `data` under `path`.
///
/// `overwrite` asks the server to replace an existing resource.
pub fn build_put(path: &str, data: &[u8], overwrite: bool, content_type: Option<&str>) -> Request {
    let mut request = Request::new(Method::Put, path);
    request.headers = entity_headers(data.len(), content_type);
    if overwrite {
        request
            .headers
            .push(("Control".to_string(), "overwrite=1".to_string()));
    }
    request.body = Some(data.to_vec());
    request
}

pub fn build_get(path: &str) -> Request {
    Request::new(Method::Get, path)
}

pub fn build_head(path: &str) -> Request {
    Request::new(Method::Head, path)
}

pub fn build_delete(path: &str) -> Request {
    Request::new(Method::Delete, path)
}

/// Build a POST sending `data` to `path`.
pub fn build_post(path: &str, data: &[u8], content_type: Option<&str>) -> Request {
    let mut request = Request::new(Method::Post, path);
    request.headers = entity_headers(data.len(), content_type);
    request.body = Some(data.to_vec());
    request
}

fn entity_headers(length: usize, content_type: Option<&str>) -> Vec<(String, String)> {
    let mut headers = vec![("Content-length".to_string(), length.to_string())];
    if let Some(content_type) = content_type {
        headers.push((
            "Content-type".to_string(),
            truncate(content_type, MAX_CONTENT_TYPE).to_string(),
        ));
    }
    headers
}

/// What to do with a body that ended before its declared length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Partial {
    Keep,
    Discard,
}

impl Context {
    /// Store `data` on the server under `path`. Only the status is read.
    pub fn put(
        &self,
        path: &str,
        data: &[u8],
        overwrite: bool,
        content_type: Option<&str>,
    ) -> Result<Status, Error> {
        let request = build_put(path, data, overwrite, content_type);
        let (status, _) = query(self, &request, QueryMode::Close)?;
        Ok(status)
    }

    /// Fetch the resource at `path`.
    ///
    /// If the body ends before its declared length the error carries the
    /// bytes that did arrive.
    pub fn get(&self, path: &str) -> Result<Response, Error> {
        let (status, conn) = query(self, &build_get(path), QueryMode::KeepOpen)?;
        let Some(mut conn) = conn.filter(|_| status == Status::OK) else {
            return Ok(Response::status_only(status));
        };
        let head = read_response_head(&mut conn)?;
        let body = self.read_body(&mut conn, &head, Partial::Keep)?;
        Ok(Response {
            status,
            content_length: head.content_length,
            content_type: head.content_type,
            body,
        })
    }

    /// Fetch only the length and type of the resource at `path`.
    pub fn head(&self, path: &str) -> Result<Response, Error> {
        let (status, conn) = query(self, &build_head(path), QueryMode::KeepOpen)?;
        let Some(mut conn) = conn.filter(|_| status == Status::OK) else {
            return Ok(Response::status_only(status));
        };
        let head = read_response_head(&mut conn)?;
        Ok(Response {
            status,
            content_length: head.content_length,
            content_type: head.content_type,
            body: Vec::new(),
        })
    }

    /// Delete the resource at `path`. Only the status is read.
    pub fn delete(&self, path: &str) -> Result<Status, Error> {
        let (status, _) = query(self, &build_delete(path), QueryMode::Close)?;
        Ok(status)
    }

    /// Send `data` to `path` and read the answer.
    ///
    /// `data` must not be empty. A body that ends before its declared length
    /// is discarded.
    pub fn post(&self, path: &str, data: &[u8], content_type: Option<&str>) -> Result<Response, Error> {
        if data.is_empty() {
            return Err(Error::NullArgument("post body"));
        }
        let request = build_post(path, data, content_type);
        let (status, conn) = query(self, &request, QueryMode::KeepOpen)?;
        let Some(mut conn) = conn.filter(|_| status == Status::OK) else {
            return Ok(Response::status_only(status));
        };
        let head = read_response_head(&mut conn)?;
        let body = self.read_body(&mut conn, &head, Partial::Discard)?;
        Ok(Response {
            status,
            content_length: head.content_length,
            content_type: head.content_type,
            body,
        })
    }

    /// Read the body announced by `head`: by length when one is declared,
    /// otherwise with the installed body reader or until the peer closes.
    fn read_body(
        &self,
        conn: &mut Connection,
        head: &ResponseHead,
        partial: Partial,
    ) -> Result<Vec<u8>, Error> {
        let Some(length) = head.content_length.filter(|&n| n > 0) else {
            return match &self.body_reader {
                Some(reader) => {
                    debug!("handing body of unknown length to the installed reader");
                    reader
                        .read_body(conn)
                        .map_err(Error::ReadUnknownLength)?;
                    Ok(Vec::new())
                }
                None => read_to_close(conn),
            };
        };

        let expected = usize::try_from(length).map_err(|_| Error::OutOfMemory { size: usize::MAX })?;
        let mut body = Vec::new();
        body.try_reserve_exact(expected)
            .map_err(|_| Error::OutOfMemory { size: expected })?;
        body.resize(expected, 0);

        match read_fixed(conn, &mut body) {
            Ok(_) => Ok(body),
            Err(received) => {
                body.truncate(received);
                if partial == Partial::Discard {
                    body = Vec::new();
                }
                Err(Error::ShortBody {
                    expected,
                    partial: body,
                    content_type: head.content_type.clone(),
                })
            }
        }
    }
}
