//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum Router with the dispatch handler
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener, plain or TLS
//! - Resolve client address and host, decide, then forward or reject
//! - Drain tunnels on shutdown
//!
//! # Data Flow
//! ```text
//! request
//!     → SetRequestId → Trace (span per request) → PropagateRequestId
//!     → dispatch: client_addr::resolve + request_host
//!     → RoutingTable::decide
//!     → Forwarder::forward | response::{forbidden, not_found, upstream_unconfigured}
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnFailure, TraceLayer},
};
use tracing::Level;

use crate::config::{ConfigError, ProxyConfig};
use crate::http::forward::Forwarder;
use crate::http::request::{request_host, UuidRequestId, X_REQUEST_ID};
use crate::http::response;
use crate::net::client_addr;
use crate::net::tls::upstream_client_config;
use crate::observability::{metrics, spans};
use crate::routing::{Decision, RoutingTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RoutingTable>,
    pub forwarder: Forwarder,
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    routes: Arc<RoutingTable>,
    forwarder: Forwarder,
    shutdown_grace: Duration,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &ProxyConfig) -> Result<Self, ConfigError> {
        let routes = Arc::new(RoutingTable::from_config(config)?);
        let upstream_tls =
            upstream_client_config(&config.upstream_tls).map_err(ConfigError::UpstreamTls)?;
        let forwarder = Forwarder::new(&config.timeouts, upstream_tls, config.listener.tls.is_some());

        let state = AppState {
            routes: Arc::clone(&routes),
            forwarder: forwarder.clone(),
        };

        Ok(Self {
            router: Self::build_router(state),
            routes,
            forwarder,
            shutdown_grace: Duration::from_secs(config.timeouts.shutdown_grace_secs),
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Every method and path lands in `dispatch`, so the router is only a
    /// carrier for state and layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                    .layer(
                        TraceLayer::new_for_http()
                            .make_span_with(spans::request_span)
                            .on_failure(DefaultOnFailure::new().level(Level::DEBUG)),
                    )
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    /// The compiled routing table this server decides with.
    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, tls = false, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Stopping listener, draining in-flight requests");
            })
            .await?;

        drain_tunnels(&self.forwarder, self.shutdown_grace).await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, tls = true, "HTTP server starting");

        let handle = axum_server::Handle::new();
        let grace = self.shutdown_grace;
        let signal_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Stopping listener, draining in-flight requests");
            signal_handle.graceful_shutdown(Some(grace));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await?;

        drain_tunnels(&self.forwarder, self.shutdown_grace).await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn drain_tunnels(forwarder: &Forwarder, grace: Duration) {
    let tunnels = forwarder.tunnels();
    let open = tunnels.active_count();
    if open == 0 {
        return;
    }

    tracing::info!(tunnels = open, grace_secs = grace.as_secs(), "Waiting for tunnels to close");
    if !tunnels.drain(grace).await {
        tracing::warn!(
            tunnels = tunnels.active_count(),
            "Shutdown grace elapsed with tunnels still open"
        );
    }
}

/// Main proxy handler.
async fn dispatch(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let host = request_host(&request);
    let client_ip = client_addr::resolve(peer, request.headers());
    let decision = state.routes.decide(&host, &client_ip);
    spans::record_routing(&host, client_ip.as_str(), decision.label());

    let response = match &decision {
        Decision::Forward(upstream) => {
            spans::record_upstream(upstream.as_str());
            tracing::debug!(upstream = %upstream, "Forwarding request");
            state.forwarder.forward(request, upstream, peer).await
        }
        Decision::Forbidden(ip, host) => {
            tracing::warn!(client_ip = %ip, host = %host, "Client address not allowed for host");
            response::forbidden(ip, host)
        }
        Decision::NotFound(host) => {
            tracing::info!(host = %host, "Host not configured");
            response::not_found(host)
        }
        Decision::BadGateway(name) => {
            tracing::error!(
                upstream = %name,
                host = %host,
                "Route references an upstream missing from the registry"
            );
            response::upstream_unconfigured(name)
        }
    };

    metrics::record_request(decision.label(), response.status().as_u16(), start);
    response
}
