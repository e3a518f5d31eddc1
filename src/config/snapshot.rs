//! Immutable per-request view of the routing configuration.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::schema::{ProxyConfig, RewriteMode};
use crate::http::response::ContentRules;
use crate::routing::RouteTable;

/// The tables one request is processed against.
#[derive(Debug, Clone, Default)]
pub struct ProxySnapshot {
    pub routes: RouteTable,
    pub content_rules: ContentRules,
    pub rewrite_mode: RewriteMode,
}

impl ProxySnapshot {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            routes: RouteTable::from_config(&config.hosts_urls),
            content_rules: ContentRules::from_config(&config.content_of_type),
            rewrite_mode: config.rewrite.mode,
        }
    }
}

/// Read-through accessor over the current snapshot.
///
/// Readers never block writers; a reload replaces the whole snapshot.
#[derive(Debug)]
pub struct SnapshotStore {
    current: ArcSwap<ProxySnapshot>,
}

impl SnapshotStore {
    pub fn new(snapshot: ProxySnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// The snapshot in effect right now.
    pub fn load(&self) -> Arc<ProxySnapshot> {
        self.current.load_full()
    }

    /// Replace the snapshot seen by subsequent requests.
    pub fn store(&self, snapshot: ProxySnapshot) {
        self.current.store(Arc::new(snapshot));
    }
}
