//! HTTP sandbox library: route table, diagnostic handlers and server.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::SandboxConfig;
pub use error::DispatchError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::Router;
