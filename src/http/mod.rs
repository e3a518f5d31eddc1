//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → server.rs (proxy middleware, loads one config snapshot)
//!     → [routing resolves /<alias> to a target URL]
//!         no match → application router ("next handler")
//!     → request.rs (build upstream request, send, buffer body)
//!     → response.rs (copy headers, rewrite body by content type)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ClientBuildError, ForwardError, Forwarder, UpstreamResponse};
pub use response::{ContentRules, ResponseRewriter};
pub use server::{application_router, AppState, HttpServer};
