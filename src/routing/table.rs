//! The static route table.
//!
//! Both namespaces are produced by [`register_namespace`], so the primary
//! and playground tables cannot drift apart.

use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::routing::matcher::PathPrefixMatcher;

/// The handler a route dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Hello,
    Echo,
    DumpMeta,
    DumpUpload,
    HelloWithBasicAuth,
    HelloWithDigestAuth,
}

impl Endpoint {
    pub const ALL: [Endpoint; 6] = [
        Endpoint::Hello,
        Endpoint::Echo,
        Endpoint::DumpMeta,
        Endpoint::DumpUpload,
        Endpoint::HelloWithBasicAuth,
        Endpoint::HelloWithDigestAuth,
    ];

    /// Path segment and name suffix for this endpoint.
    pub fn slug(self) -> &'static str {
        match self {
            Endpoint::Hello => "hello",
            Endpoint::Echo => "echo",
            Endpoint::DumpMeta => "dumpmeta",
            Endpoint::DumpUpload => "dumpupload",
            Endpoint::HelloWithBasicAuth => "hello_with_basic_auth",
            Endpoint::HelloWithDigestAuth => "hello_with_digest_auth",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A compiled route: pattern, endpoint and the name used for reverse lookup.
#[derive(Debug, Clone)]
pub struct Route {
    pattern: PathPrefixMatcher,
    endpoint: Endpoint,
    name: String,
}

impl Route {
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }
}

/// A group of routes sharing a path prefix and a name prefix.
#[derive(Debug, Clone, Copy)]
pub struct Namespace {
    pub path_prefix: &'static str,
    pub name_prefix: &'static str,
    pub endpoints: &'static [Endpoint],
}

pub const PRIMARY: Namespace = Namespace {
    path_prefix: "/",
    name_prefix: "core_",
    endpoints: &Endpoint::ALL,
};

/// Same handlers as [`PRIMARY`] minus digest auth.
pub const PLAYGROUND: Namespace = Namespace {
    path_prefix: "/playground/",
    name_prefix: "core_playground_",
    endpoints: &[
        Endpoint::Hello,
        Endpoint::Echo,
        Endpoint::DumpMeta,
        Endpoint::DumpUpload,
        Endpoint::HelloWithBasicAuth,
    ],
};

/// Errors raised while compiling a route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("duplicate route pattern '{0}'")]
    DuplicatePattern(String),

    #[error("duplicate route name '{0}'")]
    DuplicateName(String),
}

/// Accumulates routes in registration order, enforcing uniqueness.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    mount_prefix: String,
    routes: Vec<Route>,
    patterns: HashSet<String>,
    names: HashSet<String>,
}

impl RouteTableBuilder {
    /// `mount_prefix` is prepended to every pattern ("" or e.g. "/core").
    pub fn new(mount_prefix: impl Into<String>) -> Self {
        Self {
            mount_prefix: mount_prefix.into(),
            ..Self::default()
        }
    }

    pub fn route(
        &mut self,
        path: &str,
        endpoint: Endpoint,
        name: &str,
    ) -> Result<&mut Self, RoutingError> {
        let pattern = format!("{}{}", self.mount_prefix, path);
        if self.patterns.contains(&pattern) {
            return Err(RoutingError::DuplicatePattern(pattern));
        }
        if self.names.contains(name) {
            return Err(RoutingError::DuplicateName(name.to_string()));
        }

        self.patterns.insert(pattern.clone());
        self.names.insert(name.to_string());
        self.routes.push(Route {
            pattern: PathPrefixMatcher::new(pattern),
            endpoint,
            name: name.to_string(),
        });
        Ok(self)
    }

    pub fn build(self) -> Vec<Route> {
        self.routes
    }
}

/// Register every endpoint of `namespace` as `<path_prefix><slug>/`.
pub fn register_namespace(
    builder: &mut RouteTableBuilder,
    namespace: &Namespace,
) -> Result<(), RoutingError> {
    for &endpoint in namespace.endpoints {
        let path = format!("{}{}/", namespace.path_prefix, endpoint.slug());
        let name = format!("{}{}", namespace.name_prefix, endpoint.slug());
        builder.route(&path, endpoint, &name)?;
    }
    Ok(())
}

/// The sandbox table: primary namespace first, then the playground.
pub fn sandbox_routes(mount_prefix: &str) -> Result<Vec<Route>, RoutingError> {
    let mut builder = RouteTableBuilder::new(mount_prefix);
    register_namespace(&mut builder, &PRIMARY)?;
    register_namespace(&mut builder, &PLAYGROUND)?;
    Ok(builder.build())
}
