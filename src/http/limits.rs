//! Concurrency backpressure.
//!
//! A semaphore caps the number of requests in flight. When the cap is
//! reached new requests wait for a slot instead of being rejected.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Semaphore;

pub async fn concurrency_limit_middleware(
    State(slots): State<Arc<Semaphore>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Held until the response is produced.
    let Ok(_permit) = Arc::clone(&slots).acquire_owned().await else {
        tracing::error!("Concurrency semaphore closed");
        return (StatusCode::SERVICE_UNAVAILABLE, "Server shutting down").into_response();
    };

    tracing::trace!(available = slots.available_permits(), "Request slot acquired");
    next.run(request).await
}
