//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, tables keep file order)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → snapshot.rs (route table + content rules as one ProxySnapshot)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<ProxySnapshot>
//!     → the next request observes the new tables
//! ```
//!
//! # Design Decisions
//! - A request loads one snapshot and uses it for both resolving and rewriting
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod snapshot;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ClientConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, RewriteMode,
};
pub use snapshot::{ProxySnapshot, SnapshotStore};
