//! Request-path errors and their HTTP mapping.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures surfaced while dispatching a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No route pattern matched the request path.
    #[error("no route matches '{path}'")]
    NotFound { path: String },

    /// Credentials were missing or wrong. `challenge` is the
    /// `WWW-Authenticate` value the client should answer.
    #[error("authentication required")]
    Unauthorized { challenge: String },

    /// Malformed body, upload or query parameter.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The body grew past `limits.max_body_size` while being read.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
}

impl DispatchError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            DispatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, self.to_string()).into_response();

        if let DispatchError::Unauthorized { challenge } = &self {
            match HeaderValue::from_str(challenge) {
                Ok(value) => {
                    response
                        .headers_mut()
                        .insert(header::WWW_AUTHENTICATE, value);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Challenge is not a valid header value");
                }
            }
        }

        response
    }
}
