//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the first route matching a request path
//! - Resolve route names back to paths
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (the table is tiny)
//! - O(1) reverse lookup via HashMap
//! - Explicit NotFound rather than silent default
//! - A path missing only its trailing slash gets a redirect target

use std::collections::HashMap;

use crate::error::DispatchError;
use crate::routing::table::{sandbox_routes, Route, RoutingError};

/// Ordered, read-only route table.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
    by_name: HashMap<String, usize>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        let by_name = routes
            .iter()
            .enumerate()
            .map(|(idx, route)| (route.name().to_string(), idx))
            .collect();
        Self { routes, by_name }
    }

    /// Build the sandbox table mounted under `mount_prefix`.
    pub fn sandbox(mount_prefix: &str) -> Result<Self, RoutingError> {
        Ok(Self::new(sandbox_routes(mount_prefix)?))
    }

    /// Find the first route whose pattern matches `path`.
    pub fn resolve(&self, path: &str) -> Result<&Route, DispatchError> {
        self.routes
            .iter()
            .find(|route| route.matches(path))
            .ok_or_else(|| DispatchError::NotFound {
                path: path.to_string(),
            })
    }

    /// Where to send a request whose `path` misses only for lack of a
    /// trailing slash. The query string is carried over.
    pub fn append_slash(&self, path: &str, query: Option<&str>) -> Option<String> {
        if path.ends_with('/') {
            return None;
        }
        let slashed = format!("{path}/");
        self.resolve(&slashed).ok()?;
        Some(match query {
            Some(query) => format!("{slashed}?{query}"),
            None => slashed,
        })
    }

    /// Path of the route registered under `name`.
    pub fn url_for(&self, name: &str) -> Option<&str> {
        self.by_name
            .get(name)
            .map(|&idx| self.routes[idx].pattern())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
