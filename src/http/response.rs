//! Response builders shared by the handlers.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// `text/plain` response.
pub fn text(status: StatusCode, body: impl Into<String>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8))],
        body.into(),
    )
        .into_response()
}

/// Raw bytes with an explicit content type.
pub fn bytes(status: StatusCode, content_type: HeaderValue, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    response
}

/// `200 OK` with a JSON body.
pub fn json<T: Serialize>(value: &T) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}
