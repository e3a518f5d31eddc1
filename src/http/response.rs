//! Response handling and body rewriting.
//!
//! # Responsibilities
//! - Copy upstream headers onto the client response
//! - Strip `transfer-encoding`: the body is re-sent fully materialized
//! - Rewrite absolute backend URLs in the body back into `/<alias>` paths
//!   when the content type matches a configured rule
//!
//! # Design Decisions
//! - Media type match is exact string equality on the part before `;`
//! - Only the first matching content rule is considered
//! - Bodies that are not valid UTF-8 are passed through untouched
//! - A rewritten body drops the upstream `content-length` so it is recomputed

use axum::{
    body::Body,
    http::header::{self, HeaderMap},
    response::Response,
};
use indexmap::IndexMap;

use crate::config::{ProxySnapshot, RewriteMode};
use crate::http::request::UpstreamResponse;
use crate::observability::metrics;
use crate::routing::RouteTable;

/// Ordered rule name → media type table.
///
/// Rule names are labels only; they have no relation to route aliases.
#[derive(Debug, Clone, Default)]
pub struct ContentRules {
    rules: Vec<(String, String)>,
}

impl ContentRules {
    pub fn new(rules: Vec<(String, String)>) -> Self {
        Self { rules }
    }

    /// Build from the `content_of_type` config table, keeping its order.
    pub fn from_config(content_of_type: &IndexMap<String, String>) -> Self {
        Self::new(
            content_of_type
                .iter()
                .map(|(name, media_type)| (name.clone(), media_type.clone()))
                .collect(),
        )
    }

    /// Name of the first rule whose media type equals `media_type`.
    pub fn first_match(&self, media_type: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|(_, rule_type)| rule_type == media_type)
            .map(|(name, _)| name.as_str())
    }
}

/// The media type of a `content-type` value, without parameters.
pub fn declared_media_type(content_type: &str) -> Option<&str> {
    let media_type = content_type.split(';').next()?.trim();
    (!media_type.is_empty()).then_some(media_type)
}

/// Copy every upstream header in received order, minus `transfer-encoding`.
pub fn copy_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream.iter() {
        headers.append(name.clone(), value.clone());
    }
    headers.remove(header::TRANSFER_ENCODING);
    headers
}

/// Decides whether a response body is rewritten, against one snapshot.
pub struct ResponseRewriter<'a> {
    routes: &'a RouteTable,
    rules: &'a ContentRules,
    mode: RewriteMode,
}

impl<'a> ResponseRewriter<'a> {
    pub fn new(routes: &'a RouteTable, rules: &'a ContentRules, mode: RewriteMode) -> Self {
        Self {
            routes,
            rules,
            mode,
        }
    }

    pub fn from_snapshot(snapshot: &'a ProxySnapshot) -> Self {
        Self::new(&snapshot.routes, &snapshot.content_rules, snapshot.rewrite_mode)
    }

    /// The rewritten body, or `None` when the original bytes should be sent.
    pub fn rewrite(&self, content_type: Option<&str>, body: &[u8]) -> Option<String> {
        let media_type = declared_media_type(content_type?)?;
        let rule = self.rules.first_match(media_type)?;

        let text = match std::str::from_utf8(body) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(
                    rule = %rule,
                    error = %e,
                    "Body is not valid UTF-8, passing through"
                );
                return None;
            }
        };

        let mut mapped = self.routes.routes().filter(|route| route.is_mapped());
        let candidate = match self.mode {
            RewriteMode::LastEntryWins => mapped
                .map(|route| text.replace(route.base_url(), &format!("/{}", route.alias())))
                .last(),
            RewriteMode::Cumulative => {
                let first = mapped.next()?;
                let seed = text.replace(first.base_url(), &format!("/{}", first.alias()));
                Some(mapped.fold(seed, |acc, route| {
                    acc.replace(route.base_url(), &format!("/{}", route.alias()))
                }))
            }
        }?;

        if candidate.trim().is_empty() {
            return None;
        }

        tracing::debug!(rule = %rule, media_type = %media_type, "Rewrote response body");
        metrics::record_rewrite(rule);
        Some(candidate)
    }

    /// Turn a buffered upstream response into the client response.
    pub fn apply(&self, upstream: UpstreamResponse) -> Response<Body> {
        let rewritten = self.rewrite(upstream.content_type(), &upstream.body);
        let UpstreamResponse {
            status,
            mut headers,
            body,
        } = upstream;

        let body = match rewritten {
            Some(text) => {
                headers.remove(header::CONTENT_LENGTH);
                Body::from(text)
            }
            None => Body::from(body),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Route;
    use axum::body::Bytes;
    use axum::http::{HeaderValue, StatusCode};

    fn routes(entries: &[(&str, &str)]) -> RouteTable {
        RouteTable::new(entries.iter().map(|(a, u)| Route::new(*a, *u)).collect())
    }

    fn rules(entries: &[(&str, &str)]) -> ContentRules {
        ContentRules::new(
            entries
                .iter()
                .map(|(n, t)| (n.to_string(), t.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_last_entry_wins() {
        let routes = routes(&[("a", "http://x/"), ("b", "http://y/")]);
        let rules = rules(&[("r1", "text/html")]);
        let rewriter = ResponseRewriter::new(&routes, &rules, RewriteMode::LastEntryWins);

        let out = rewriter
            .rewrite(Some("text/html"), b"see http://x/ and http://y/")
            .unwrap();
        assert_eq!(out, "see http://x/ and /b");
    }

    #[test]
    fn test_last_entry_wins_even_without_occurrence() {
        let routes = routes(&[("a", "http://x/"), ("b", "http://y/")]);
        let rules = rules(&[("r1", "text/html")]);
        let rewriter = ResponseRewriter::new(&routes, &rules, RewriteMode::LastEntryWins);

        // the last entry's candidate is the untouched body
        let out = rewriter.rewrite(Some("text/html"), b"only http://x/ here").unwrap();
        assert_eq!(out, "only http://x/ here");
    }

    #[test]
    fn test_cumulative_replaces_all() {
        let routes = routes(&[("a", "http://x/"), ("b", "http://y/")]);
        let rules = rules(&[("r1", "text/html")]);
        let rewriter = ResponseRewriter::new(&routes, &rules, RewriteMode::Cumulative);

        let out = rewriter
            .rewrite(Some("text/html"), b"see http://x/ and http://y/")
            .unwrap();
        assert_eq!(out, "see /a and /b");
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let routes = routes(&[("svc", "http://backend.local")]);
        let rules = rules(&[("html", "text/html")]);
        let rewriter = ResponseRewriter::new(&routes, &rules, RewriteMode::LastEntryWins);

        let out = rewriter
            .rewrite(
                Some("text/html"),
                b"<a href=\"http://backend.local/a\">a</a><a href=\"http://backend.local/b\">b</a>",
            )
            .unwrap();
        assert_eq!(out, "<a href=\"/svc/a\">a</a><a href=\"/svc/b\">b</a>");
    }

    #[test]
    fn test_content_type_parameters_ignored() {
        let routes = routes(&[("svc", "http://backend.local")]);
        let rules = rules(&[("html", "text/html")]);
        let rewriter = ResponseRewriter::new(&routes, &rules, RewriteMode::LastEntryWins);

        let out = rewriter.rewrite(Some("text/html; charset=utf-8"), b"http://backend.local/x");
        assert_eq!(out.as_deref(), Some("/svc/x"));
    }

    #[test]
    fn test_no_matching_rule() {
        let routes = routes(&[("svc", "http://backend.local")]);
        let rules = rules(&[("html", "text/html")]);
        let rewriter = ResponseRewriter::new(&routes, &rules, RewriteMode::LastEntryWins);

        assert_eq!(rewriter.rewrite(Some("application/octet-stream"), b"http://backend.local"), None);
        assert_eq!(rewriter.rewrite(Some("text/*"), b"http://backend.local"), None);
        assert_eq!(rewriter.rewrite(Some("TEXT/HTML"), b"http://backend.local"), None);
        assert_eq!(rewriter.rewrite(None, b"http://backend.local"), None);
    }

    #[test]
    fn test_only_first_rule_counts() {
        // matching rule found, but no mapped routes: nothing to keep
        let routes = routes(&[("svc", "")]);
        let rules = rules(&[("first", "text/html"), ("second", "text/html")]);
        let rewriter = ResponseRewriter::new(&routes, &rules, RewriteMode::LastEntryWins);
        assert_eq!(rewriter.rewrite(Some("text/html"), b"body"), None);
        assert_eq!(rules.first_match("text/html"), Some("first"));
    }

    #[test]
    fn test_blank_body_passes_through() {
        let routes = routes(&[("svc", "http://backend.local")]);
        let rules = rules(&[("html", "text/html")]);
        let rewriter = ResponseRewriter::new(&routes, &rules, RewriteMode::LastEntryWins);
        assert_eq!(rewriter.rewrite(Some("text/html"), b""), None);
        assert_eq!(rewriter.rewrite(Some("text/html"), b"  \n "), None);
    }

    #[test]
    fn test_invalid_utf8_passes_through() {
        let routes = routes(&[("svc", "http://backend.local")]);
        let rules = rules(&[("html", "text/html")]);
        let rewriter = ResponseRewriter::new(&routes, &rules, RewriteMode::LastEntryWins);
        assert_eq!(rewriter.rewrite(Some("text/html"), &[0xff, 0xfe, b'h']), None);
    }

    #[test]
    fn test_copy_headers_drops_transfer_encoding() {
        let mut upstream = HeaderMap::new();
        upstream.insert("x-first", HeaderValue::from_static("1"));
        upstream.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        upstream.append("set-cookie", HeaderValue::from_static("a=1"));
        upstream.append("set-cookie", HeaderValue::from_static("b=2"));

        let headers = copy_response_headers(&upstream);
        assert!(headers.get("transfer-encoding").is_none());
        assert_eq!(headers["x-first"], "1");
        let cookies: Vec<_> = headers.get_all("set-cookie").iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }

    #[tokio::test]
    async fn test_apply_recomputes_length() {
        let routes = routes(&[("svc", "http://backend.local")]);
        let rules = rules(&[("html", "text/html")]);
        let rewriter = ResponseRewriter::new(&routes, &rules, RewriteMode::LastEntryWins);

        let body = Bytes::from_static(b"go to http://backend.local/page");
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/html"));
        headers.insert("content-length", HeaderValue::from(body.len()));

        let response = rewriter.apply(UpstreamResponse {
            status: StatusCode::CREATED,
            headers,
            body,
        });

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().get("content-length").is_none());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"go to /svc/page");
    }

    #[tokio::test]
    async fn test_apply_passes_bytes_through() {
        let routes = routes(&[("svc", "http://backend.local")]);
        let rules = rules(&[("html", "text/html")]);
        let rewriter = ResponseRewriter::new(&routes, &rules, RewriteMode::LastEntryWins);

        let body = Bytes::from_static(&[0x00, 0x01, 0xff, b'h', b't']);
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/octet-stream"));
        headers.insert("content-length", HeaderValue::from(body.len()));

        let response = rewriter.apply(UpstreamResponse {
            status: StatusCode::OK,
            headers,
            body: body.clone(),
        });

        assert_eq!(response.headers()["content-length"], "5");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes, body);
    }
}
