use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub mod scripted;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A stored resource: its bytes and the type it was uploaded with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    pub content_type: Option<String>,
    pub data: Bytes,
}

pub type Store = Arc<RwLock<HashMap<String, Resource>>>;

/// Resource store over every path.
///
/// - `PUT` creates (201) or, with `Control: overwrite=1`, replaces (200);
///   replacing without it is a 409.
/// - `GET`/`HEAD` return the bytes with their content type, or 404.
/// - `DELETE` removes (200) or 404.
/// - `POST` echoes the request body and content type back.
pub fn app() -> Router {
    router(Store::default())
}

/// Like `app`, but every request must carry `Authorization: Basic` for
/// `user:pass`; anything else gets a 401.
pub fn app_with_basic_auth(user: &str, pass: &str) -> Router {
    let expected = format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")));
    router(Store::default()).layer(middleware::from_fn_with_state(
        Arc::new(expected),
        require_basic_auth,
    ))
}

pub fn router(store: Store) -> Router {
    Router::new()
        .route(
            "/{*path}",
            get(get_resource)
                .put(put_resource)
                .post(echo)
                .delete(delete_resource),
        )
        .with_state(store)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_basic_auth(
    listener: TcpListener,
    user: &str,
    pass: &str,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_basic_auth(user, pass)).await
}

async fn require_basic_auth(
    State(expected): State<Arc<String>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if authorized {
        next.run(request).await
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn with_type(content_type: Option<String>, data: Bytes) -> Response {
    let content_type = content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    ([(header::CONTENT_TYPE, content_type)], data).into_response()
}

async fn get_resource(
    State(store): State<Store>,
    Path(path): Path<String>,
) -> Result<Response, StatusCode> {
    let store = store.read().await;
    let resource = store.get(&path).cloned().ok_or(StatusCode::NOT_FOUND)?;
    Ok(with_type(resource.content_type, resource.data))
}

async fn put_resource(
    State(store): State<Store>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let overwrite = headers
        .get("control")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "overwrite=1");
    let mut store = store.write().await;
    let exists = store.contains_key(&path);
    if exists && !overwrite {
        return StatusCode::CONFLICT;
    }
    debug!(%path, len = body.len(), overwrite, "storing resource");
    store.insert(
        path,
        Resource {
            content_type: content_type(&headers),
            data: body,
        },
    );
    if exists {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    }
}

async fn delete_resource(State(store): State<Store>, Path(path): Path<String>) -> StatusCode {
    let mut store = store.write().await;
    store
        .remove(&path)
        .map(|_| StatusCode::OK)
        .unwrap_or(StatusCode::NOT_FOUND)
}

async fn echo(headers: HeaderMap, body: Bytes) -> Response {
    with_type(content_type(&headers), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_is_read_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_type(&headers), None);
        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        assert_eq!(content_type(&headers).as_deref(), Some("text/plain"));
    }

    #[test]
    fn missing_type_defaults_to_octet_stream() {
        let response = with_type(None, Bytes::from_static(b"x"));
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            DEFAULT_CONTENT_TYPE
        );
    }
}
