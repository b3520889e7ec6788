//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → limits.rs (concurrency slot)
//!     → routing::Router::resolve → handlers::invoke
//!     → response.rs (text / JSON bodies)
//!     → Send to client
//! ```

pub mod limits;
pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerError};
