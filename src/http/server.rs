//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with a single dispatching fallback
//! - Wire up middleware (request ID, tracing, timeout, limits)
//! - Resolve routes and invoke handlers
//! - Serve with graceful, deadline-bounded shutdown

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Redirect, Response},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot, Semaphore};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::Authenticator;
use crate::config::SandboxConfig;
use crate::handlers;
use crate::http::limits::concurrency_limit_middleware;
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::observability::metrics::{self, UNMATCHED_ROUTE};
use crate::routing::{Router as RouteTable, RoutingError};

/// Application state injected into handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<RouteTable>,
    pub auth: Arc<Authenticator>,
    pub greeting: Arc<str>,
    pub max_body_size: usize,
    /// Longest `delay` echo accepts.
    pub max_delay: Duration,
}

impl AppState {
    pub fn from_config(config: &SandboxConfig) -> Result<Self, RoutingError> {
        Self::with_auth(config, Authenticator::new(&config.auth))
    }

    /// State with a caller-supplied authenticator (fixed nonce secret in tests).
    pub fn with_auth(
        config: &SandboxConfig,
        auth: Authenticator,
    ) -> Result<Self, RoutingError> {
        Ok(Self {
            router: Arc::new(RouteTable::sandbox(&config.routing.mount_prefix)?),
            auth: Arc::new(auth),
            greeting: Arc::from(config.sandbox.greeting.as_str()),
            max_body_size: config.limits.max_body_size,
            max_delay: Duration::from_secs(config.timeouts.request_secs),
        })
    }
}

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid route table: {0}")]
    Routing(#[from] RoutingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for the sandbox endpoints.
pub struct HttpServer {
    router: Router,
    config: SandboxConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: SandboxConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(&config)?;
        Ok(Self::with_state(config, state))
    }

    pub fn with_state(config: SandboxConfig, state: AppState) -> Self {
        tracing::debug!(routes = state.router.routes().len(), "Route table compiled");
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers run bottom-up: the request ID is set first, the body limit
    /// is checked last before the handler.
    fn build_router(config: &SandboxConfig, state: AppState) -> Router {
        let max_body = config.limits.max_body_size;
        let slots = Arc::new(Semaphore::new(config.listener.max_connections));

        Router::new()
            .fallback(sandbox_handler)
            .with_state(state)
            .layer(DefaultBodyLimit::max(max_body))
            .layer(RequestBodyLimitLayer::new(max_body))
            .layer(middleware::from_fn_with_state(
                slots,
                concurrency_limit_middleware,
            ))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain for at most
    /// `timeouts.shutdown_grace_secs`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let (draining_tx, draining_rx) = oneshot::channel::<()>();

        let serve = axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown requested, draining in-flight requests");
                let _ = draining_tx.send(());
            })
            .into_future();
        tokio::pin!(serve);

        let deadline = async move {
            if draining_rx.await.is_ok() {
                tokio::time::sleep(grace).await;
            } else {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = &mut serve => result?,
            () = deadline => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Grace period elapsed, abandoning in-flight requests"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        request_id = %request_id(request.headers()),
        method = %request.method(),
        uri = %request.uri(),
    )
}

/// Resolve the route for the request path and run its handler.
async fn sandbox_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let route = match state.router.resolve(&path) {
        Ok(route) => route,
        Err(err) => {
            if let Some(location) = state.router.append_slash(&path, request.uri().query()) {
                tracing::debug!(path = %path, location = %location, "Redirecting to slash form");
                let response = Redirect::permanent(&location).into_response();
                let status = response.status().as_u16();
                metrics::record_request(method.as_str(), status, UNMATCHED_ROUTE, start);
                return response;
            }
            tracing::warn!(path = %path, "No route matched");
            metrics::record_request(method.as_str(), 404, UNMATCHED_ROUTE, start);
            return err.into_response();
        }
    };

    let response = match handlers::invoke(route.endpoint(), &state, request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::info!(route = route.name(), error = %err, "Request rejected");
            err.into_response()
        }
    };

    let status = response.status();
    tracing::debug!(route = route.name(), status = %status, "Request handled");
    metrics::record_request(method.as_str(), status.as_u16(), route.name(), start);
    response
}
