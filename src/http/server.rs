//! HTTP server setup and the proxy middleware.
//!
//! # Responsibilities
//! - Build the application router (the "next handler")
//! - Put the proxy middleware in front of it
//! - Own the shared upstream client and the snapshot store
//! - Apply config updates between requests
//! - Serve until shutdown

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;

use crate::config::{ProxyConfig, ProxySnapshot, SnapshotStore};
use crate::http::request::{ClientBuildError, Forwarder};
use crate::http::response::ResponseRewriter;
use crate::lifecycle::shutdown;
use crate::observability::metrics;

/// Application state injected into the proxy middleware.
#[derive(Clone)]
pub struct AppState {
    pub snapshots: Arc<SnapshotStore>,
    pub forwarder: Forwarder,
}

/// HTTP server for the alias proxy.
pub struct HttpServer {
    router: Router,
    snapshots: Arc<SnapshotStore>,
}

impl HttpServer {
    /// Create a server whose unmatched requests go to [`application_router`].
    pub fn new(config: ProxyConfig) -> Result<Self, ClientBuildError> {
        Self::with_application(config, application_router())
    }

    /// Create a server that proxies in front of `application`.
    pub fn with_application(
        config: ProxyConfig,
        application: Router,
    ) -> Result<Self, ClientBuildError> {
        let snapshots = Arc::new(SnapshotStore::new(ProxySnapshot::from_config(&config)));
        let forwarder = Forwarder::new(&config.client)?;

        let state = AppState {
            snapshots: snapshots.clone(),
            forwarder,
        };

        tracing::info!(
            routes = config.hosts_urls.len(),
            content_rules = config.content_of_type.len(),
            rewrite_mode = ?config.rewrite.mode,
            "Proxy tables loaded"
        );

        let router = Self::build_router(application, state);
        Ok(Self { router, snapshots })
    }

    fn build_router(application: Router, state: AppState) -> Router {
        application
            .layer(middleware::from_fn_with_state(state, proxy_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// The full service, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle on the live snapshot store.
    pub fn snapshots(&self) -> Arc<SnapshotStore> {
        self.snapshots.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// Every config received on `config_updates` replaces the route table
    /// and content rules for subsequent requests. Listener and client
    /// settings are fixed for the server's lifetime.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        tokio::spawn(apply_config_updates(self.snapshots.clone(), config_updates));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// The handler unmatched requests fall through to.
pub fn application_router() -> Router {
    Router::new()
        .route("/", get(|| async { "Hello World!" }))
        .fallback(|| async { StatusCode::NOT_FOUND })
}

async fn apply_config_updates(
    snapshots: Arc<SnapshotStore>,
    mut updates: mpsc::UnboundedReceiver<ProxyConfig>,
) {
    while let Some(config) = updates.recv().await {
        snapshots.store(ProxySnapshot::from_config(&config));
        tracing::info!(
            routes = config.hosts_urls.len(),
            content_rules = config.content_of_type.len(),
            "Route tables reloaded"
        );
    }
}

/// Resolve the alias; proxy on a match, otherwise hand over to `next`.
async fn proxy_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let snapshot = state.snapshots.load();

    let query = request
        .uri()
        .query()
        .map(|q| format!("?{}", q))
        .unwrap_or_default();

    let Some(route) = snapshot.routes.resolve(request.uri().path(), &query) else {
        return next.run(request).await;
    };

    let start_time = Instant::now();
    let method = request.method().to_string();

    tracing::debug!(
        alias = %route.alias,
        method = %method,
        path = %request.uri().path(),
        upstream = %route.target,
        "Proxying request"
    );

    let upstream = match state.forwarder.forward(&route.target, request).await {
        Ok(upstream) => upstream,
        Err(e) => {
            tracing::error!(
                alias = %route.alias,
                upstream = %route.target,
                error = %e,
                "Upstream error"
            );
            metrics::record_upstream_error(&route.alias);
            metrics::record_request(&route.alias, &method, e.status().as_u16(), start_time);
            return e.into_response();
        }
    };

    let status = upstream.status;
    let rewriter = ResponseRewriter::from_snapshot(&snapshot);
    let response = rewriter.apply(upstream);

    metrics::record_request(&route.alias, &method, status.as_u16(), start_time);

    tracing::debug!(
        alias = %route.alias,
        status = %status,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Request proxied"
    );

    response
}
