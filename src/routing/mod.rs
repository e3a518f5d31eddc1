//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → router.rs (scan route table in order)
//!     → matcher.rs (does the path start with /<alias>?)
//!     → Return: RouteMatch { alias, target } or None
//!
//! None means the request is not proxied and goes to the next handler.
//! ```
//!
//! # Design Decisions
//! - Tables built from config, immutable at runtime
//! - No regex in hot path (segment prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered as configured)

pub mod matcher;
pub mod router;

pub use router::{Route, RouteMatch, RouteTable};
