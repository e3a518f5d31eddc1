//! Route lookup.
//!
//! # Responsibilities
//! - Store the ordered alias → base URL table
//! - Resolve a request path and query into an upstream target URL
//! - Return the matched route or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) segment scan in table order, first match wins
//! - An alias that is a prefix segment of another alias shadows it when it
//!   comes first (`api` before `api/v2`); ordering is the caller's tool

use indexmap::IndexMap;

use crate::routing::matcher::SegmentMatcher;

/// One alias → base URL binding.
#[derive(Debug, Clone)]
pub struct Route {
    alias: String,
    base_url: String,
    matcher: SegmentMatcher,
}

impl Route {
    pub fn new(alias: impl Into<String>, base_url: impl Into<String>) -> Self {
        let alias = alias.into();
        let matcher = SegmentMatcher::new(&alias);
        Self {
            alias,
            base_url: base_url.into(),
            matcher,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Blank base URLs mean "no mapping".
    pub fn is_mapped(&self) -> bool {
        !self.base_url.trim().is_empty()
    }
}

/// The result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Alias that matched.
    pub alias: String,
    /// Absolute upstream URL to forward to.
    pub target: String,
}

/// Ordered route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Build from the `hosts_urls` config table, keeping its order.
    pub fn from_config(hosts_urls: &IndexMap<String, String>) -> Self {
        Self::new(
            hosts_urls
                .iter()
                .map(|(alias, url)| Route::new(alias.as_str(), url.as_str()))
                .collect(),
        )
    }

    /// Routes in table order, including unmapped ones.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Resolve `path` (and `query`, passed with its leading `?` or empty)
    /// to the first matching route's target URL.
    pub fn resolve(&self, path: &str, query: &str) -> Option<RouteMatch> {
        self.routes
            .iter()
            .filter(|route| route.is_mapped())
            .find_map(|route| {
                let remaining = route.matcher.strip(path)?;
                Some(RouteMatch {
                    alias: route.alias.clone(),
                    target: join_target(&route.base_url, remaining, query),
                })
            })
    }
}

/// `base_url + remaining + query`, dropping one slash where a trailing `/`
/// on the base meets the leading `/` of the remainder.
///
/// This is the only slash ever touched: `http://backend.local/` with
/// `/x` gives `http://backend.local/x` rather than a plain concatenation's
/// `//x`. Duplicate slashes anywhere else (inside the base URL, or a
/// remainder like `//x`) are kept as written.
fn join_target(base_url: &str, remaining: &str, query: &str) -> String {
    let base = if base_url.ends_with('/') && remaining.starts_with('/') {
        &base_url[..base_url.len() - 1]
    } else {
        base_url
    };

    let mut target = String::with_capacity(base.len() + remaining.len() + query.len());
    target.push_str(base);
    target.push_str(remaining);
    target.push_str(query);
    target
}
