use axum::http::StatusCode;
use axum::response::Response;

use crate::http::response;

/// Fixed greeting, ignoring the request entirely.
pub fn hello(greeting: &str) -> Response {
    response::text(StatusCode::OK, greeting)
}
