//! Request forwarding to the upstream.
//!
//! # Responsibilities
//! - Map the inbound method onto the upstream verb
//! - Decide whether the inbound body travels upstream
//! - Copy inbound headers and point `Host` at the upstream
//! - Send exactly one upstream call through the shared pooled client,
//!   over plain HTTP or TLS depending on the target scheme
//! - Buffer the upstream body so it can be rewritten
//!
//! # Design Decisions
//! - The client future resolves once response headers arrive; the body is
//!   read afterwards as a separate step
//! - Dropping the returned future (caller went away) drops the in-flight
//!   upstream exchange; there is no retry
//! - Header propagation cannot fail: inbound values are already valid

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{
        header::{self, HeaderMap, HeaderValue},
        uri::InvalidUri,
        Method, Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::config::ClientConfig;
use crate::http::response::copy_response_headers;

/// Errors raised while forwarding. The proxy middleware turns them into a
/// generic failure response.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The resolved target is not a valid URI.
    #[error("invalid upstream target '{target}': {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: InvalidUri,
    },

    /// Connecting to or exchanging with the upstream failed.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    /// The upstream body could not be read to the end.
    #[error("failed to read upstream body: {0}")]
    Body(#[source] axum::Error),
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::InvalidTarget { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ForwardError::Upstream(_) | ForwardError::Body(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let message = match &self {
            ForwardError::InvalidTarget { .. } => "Invalid upstream target",
            ForwardError::Upstream(_) | ForwardError::Body(_) => "Upstream request failed",
        };
        (self.status(), message).into_response()
    }
}

/// The shared client could not be built.
#[derive(Debug, Error)]
#[error("failed to build upstream TLS client: {0}")]
pub struct ClientBuildError(#[from] rustls::Error);

/// A fully buffered upstream response.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// Upstream headers in received order, without `transfer-encoding`.
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// The raw `content-type` header, if present and readable.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Sends proxied requests through one shared, connection-pooling client.
///
/// Cloning is cheap and shares the pool.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl Forwarder {
    /// Build the pooled client. Call once per process.
    ///
    /// `http://` and `https://` targets share the pool; TLS peers are
    /// verified against the bundled webpki roots.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientBuildError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let connector = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(provider)?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build(connector);

        Ok(Self { client })
    }

    /// Forward `request` to `target` and buffer the upstream answer.
    pub async fn forward(
        &self,
        target: &str,
        request: Request<Body>,
    ) -> Result<UpstreamResponse, ForwardError> {
        let upstream = build_upstream_request(target, request)?;

        let response = self.client.request(upstream).await?;
        let (parts, body) = response.into_parts();

        tracing::debug!(
            upstream = %target,
            status = %parts.status,
            "Upstream headers received"
        );

        let body = axum::body::to_bytes(Body::new(body), usize::MAX)
            .await
            .map_err(ForwardError::Body)?;

        Ok(UpstreamResponse {
            status: parts.status,
            headers: copy_response_headers(&parts.headers),
            body,
        })
    }
}

/// Whether the inbound body is attached for this method.
///
/// GET, HEAD, DELETE and TRACE always go upstream with an empty body,
/// whatever the caller sent.
pub fn carries_body(method: &Method) -> bool {
    !(method == Method::GET
        || method == Method::HEAD
        || method == Method::DELETE
        || method == Method::TRACE)
}

/// Map an inbound method onto the canonical upstream verb.
///
/// The seven standard verbs are matched case-insensitively; anything else
/// is forwarded unchanged as an extension method.
pub fn upstream_method(method: &Method) -> Method {
    const CANONICAL: [Method; 7] = [
        Method::GET,
        Method::HEAD,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
        Method::TRACE,
    ];

    CANONICAL
        .into_iter()
        .find(|verb| verb.as_str().eq_ignore_ascii_case(method.as_str()))
        .unwrap_or_else(|| method.clone())
}

/// Build the upstream request for `target` out of the inbound request.
pub fn build_upstream_request(
    target: &str,
    request: Request<Body>,
) -> Result<Request<Body>, ForwardError> {
    let uri: Uri = target.parse().map_err(|source| ForwardError::InvalidTarget {
        target: target.to_string(),
        source,
    })?;

    let (parts, body) = request.into_parts();
    let method = upstream_method(&parts.method);
    let with_body = carries_body(&method);

    let mut headers = HeaderMap::with_capacity(parts.headers.len());
    for (name, value) in parts.headers.iter() {
        if name == header::HOST {
            continue;
        }
        // An empty body is sent for these methods; the inbound framing
        // headers would describe bytes that never go out.
        if !with_body && (name == header::CONTENT_LENGTH || name == header::TRANSFER_ENCODING) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if let Some(host) = uri.host() {
        if let Ok(value) = HeaderValue::from_str(host) {
            headers.insert(header::HOST, value);
        }
    }

    let mut upstream = Request::new(if with_body { body } else { Body::empty() });
    *upstream.method_mut() = method;
    *upstream.uri_mut() = uri;
    *upstream.headers_mut() = headers;

    Ok(upstream)
}
