//! Route matching logic.
//!
//! # Design Decisions
//! - Patterns are anchored path prefixes: `/hello/` matches `/hello/` and
//!   `/hello/x`, never `/xhello/` or `/hello`
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching

/// Matches the request path against an anchored prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns true if `path` starts with this prefix.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }
}
