//! Diagnostic handlers.
//!
//! # Data Flow
//! ```text
//! Route (resolved by routing::Router)
//!     → invoke(endpoint)
//!     → hello / echo / meta / upload, or auth check then hello
//!     → Response, or DispatchError for the server to render
//! ```
//!
//! # Design Decisions
//! - Handlers hold no state between requests
//! - Only the request body is read; nothing is written anywhere

pub mod echo;
pub mod hello;
pub mod meta;
pub mod upload;

use std::error::Error as StdError;

use axum::body::{Body, Bytes};
use axum::http::Request;
use axum::response::Response;
use http_body_util::LengthLimitError;

use crate::error::DispatchError;
use crate::http::server::AppState;
use crate::routing::Endpoint;

/// Run the handler for `endpoint`.
pub async fn invoke(
    endpoint: Endpoint,
    state: &AppState,
    request: Request<Body>,
) -> Result<Response, DispatchError> {
    match endpoint {
        Endpoint::Hello => Ok(hello::hello(&state.greeting)),
        Endpoint::Echo => echo::echo(request, state.max_body_size, state.max_delay).await,
        Endpoint::DumpMeta => {
            let (parts, _body) = request.into_parts();
            Ok(meta::dumpmeta(&parts))
        }
        Endpoint::DumpUpload => upload::dumpupload(request, state.max_body_size).await,
        Endpoint::HelloWithBasicAuth => {
            state.auth.check_basic(request.headers())?;
            Ok(hello::hello(&state.greeting))
        }
        Endpoint::HelloWithDigestAuth => {
            state
                .auth
                .check_digest(request.method(), request.uri(), request.headers())?;
            Ok(hello::hello(&state.greeting))
        }
    }
}

/// Buffer `body`, failing with 413 once it passes `limit` bytes.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, DispatchError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| body_error(&e, limit))
}

/// Map a body read failure, telling length limits apart from broken streams.
pub fn body_error(err: &(dyn StdError + 'static), limit: usize) -> DispatchError {
    if exceeds_limit(err) {
        tracing::debug!(limit, "Request body over limit");
        DispatchError::PayloadTooLarge { limit }
    } else {
        DispatchError::bad_request(format!("unreadable body: {err}"))
    }
}

fn exceeds_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.is::<LengthLimitError>() {
            return true;
        }
        current = err.source();
    }
    false
}
