//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (route lookup)
//!     → matcher.rs (anchored prefix check)
//!     → Return: matched Route or NotFound
//!
//! Route Compilation (at startup):
//!     table.rs register_namespace("/"), register_namespace("/playground/")
//!     → uniqueness checks on pattern and name
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)
//! - Handlers are enum-tagged, never looked up by name

pub mod matcher;
pub mod router;
pub mod table;

pub use router::Router;
pub use table::{Endpoint, Namespace, Route, RouteTableBuilder, RoutingError};
