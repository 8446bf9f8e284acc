//! Forwarding of admitted requests to their upstream.
//!
//! # Responsibilities
//! - Rewrite the URI and Host header to the upstream
//! - Shape headers (hop-by-hop removal, X-Forwarded-*)
//! - Stream request and response bodies without buffering
//! - Hand upgraded exchanges to the tunnel relay
//! - Turn failures before the response into `502 Bad Gateway`
//!
//! # Design Decisions
//! - One pooled hyper client shared by every request; the upstream is a
//!   per-call argument, so the forwarder itself holds no routing state
//! - Upstream requests always go out as HTTP/1.1 so upgrades work and
//!   HTTP/2 clients can reach HTTP/1 upstreams
//! - `http` and `https` upstreams share one client; TLS goes through
//!   rustls with the webpki roots plus any configured extra CA
//! - Connect timeout on the connector, response-header timeout around the
//!   exchange; body streaming and tunnels are not timed
//! - No retries: a failed exchange is reported once

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::HOST;
use axum::http::{HeaderValue, Request, StatusCode, Uri, Version};
use axum::response::Response;
use futures_util::TryStreamExt;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use url::{Position, Url};

use crate::config::TimeoutConfig;
use crate::error::ProxyError;
use crate::http::response;
use crate::http::websocket::spawn_tunnel;
use crate::net::connection::ConnectionTracker;
use crate::observability::metrics;
use crate::security::headers::{append_forwarded, is_upgrade_request, strip_hop_by_hop};

/// Stateless forwarding pipeline around a pooled upstream client.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    response_timeout: Duration,
    upgrade_grace: Duration,
    tunnels: ConnectionTracker,
    proto: &'static str,
}

impl Forwarder {
    /// Build a forwarder. `upstream_tls` verifies `https` upstreams; `tls`
    /// reports whether the listener terminates TLS, which decides
    /// `X-Forwarded-Proto`.
    pub fn new(timeouts: &TimeoutConfig, upstream_tls: rustls::ClientConfig, tls: bool) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);
        connector.enforce_http(false);

        let https = HttpsConnectorBuilder::new()
            .with_tls_config(upstream_tls)
            .https_or_http()
            .enable_http1()
            .wrap_connector(connector);

        let client = Client::builder(TokioExecutor::new()).build(https);

        Self {
            client,
            response_timeout: Duration::from_secs(timeouts.upstream_response_secs),
            upgrade_grace: Duration::from_secs(timeouts.upgrade_grace_secs),
            tunnels: ConnectionTracker::new(),
            proto: if tls { "https" } else { "http" },
        }
    }

    /// Tracker for relays spawned by this forwarder.
    pub fn tunnels(&self) -> &ConnectionTracker {
        &self.tunnels
    }

    /// Forward `request` to `upstream` and return the response for the
    /// client. Failures before a response exists become 502.
    pub async fn forward(&self, request: Request<Body>, upstream: &Url, peer: SocketAddr) -> Response {
        match self.exchange(request, upstream, peer).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    upstream = %upstream,
                    error = %e,
                    kind = e.kind(),
                    "Upstream request failed"
                );
                metrics::record_upstream_error(upstream.as_str());
                response::bad_gateway(&e)
            }
        }
    }

    async fn exchange(
        &self,
        mut request: Request<Body>,
        upstream: &Url,
        peer: SocketAddr,
    ) -> Result<Response, ProxyError> {
        let upgrade = is_upgrade_request(request.headers());
        let client_upgrade = upgrade.then(|| hyper::upgrade::on(&mut request));

        let (mut parts, body) = request.into_parts();
        let original_host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()));

        let authority = upstream_authority(upstream);
        parts.uri = upstream_uri(upstream, &parts.uri)?;
        parts.version = Version::HTTP_11;

        strip_hop_by_hop(&mut parts.headers, upgrade);
        append_forwarded(&mut parts.headers, peer.ip(), original_host.as_deref(), self.proto);
        if let Ok(host) = HeaderValue::from_str(authority) {
            parts.headers.insert(HOST, host);
        }

        let outbound = Request::from_parts(parts, body);

        let mut upstream_response =
            tokio::time::timeout(self.response_timeout, self.client.request(outbound))
                .await
                .map_err(|_| ProxyError::UpstreamTimeout(self.response_timeout))??;

        let switching = upstream_response.status() == StatusCode::SWITCHING_PROTOCOLS;
        if let (true, Some(client_upgrade)) = (switching, client_upgrade) {
            let upstream_upgrade = hyper::upgrade::on(&mut upstream_response);
            spawn_tunnel(
                client_upgrade,
                upstream_upgrade,
                self.upgrade_grace,
                self.tunnels.track(),
            );

            let (mut parts, _) = upstream_response.into_parts();
            strip_hop_by_hop(&mut parts.headers, true);
            return Ok(Response::from_parts(parts, Body::empty()));
        }

        let (mut parts, incoming) = upstream_response.into_parts();
        strip_hop_by_hop(&mut parts.headers, false);

        let source = upstream.to_string();
        let stream = Body::new(incoming)
            .into_data_stream()
            .inspect_err(move |e| {
                tracing::warn!(upstream = %source, error = %e, "Upstream response body failed");
            });

        Ok(Response::from_parts(parts, Body::from_stream(stream)))
    }
}

/// `host[:port]` of an upstream URL.
fn upstream_authority(upstream: &Url) -> &str {
    &upstream[Position::BeforeHost..Position::AfterPort]
}

/// Absolute URI for the upstream request: the upstream's scheme and
/// authority, its base path without trailing slash, then the original
/// path and query.
pub fn upstream_uri(upstream: &Url, original: &Uri) -> Result<Uri, ProxyError> {
    let base = upstream.path().trim_end_matches('/');
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let uri = format!(
        "{}://{}{}{}",
        upstream.scheme(),
        upstream_authority(upstream),
        base,
        path_and_query
    )
    .parse::<Uri>()?;
    Ok(uri)
}
