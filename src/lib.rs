//! Path-alias reverse proxy library.
//!
//! Requests whose path starts with `/<alias>` are forwarded to the base URL
//! configured for that alias; absolute backend URLs in matching responses
//! are rewritten back to `/<alias>` paths.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
