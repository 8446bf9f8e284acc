//! Request spans.
//!
//! Every request runs inside one `request` span created by the trace
//! layer. The dispatcher fills in the routing fields once they are known,
//! so every event logged while handling the request carries them.

use axum::body::Body;
use axum::http::Request;
use tracing::field::{display, Empty};
use tracing::Span;

use crate::http::request::X_REQUEST_ID;

/// Build the span for an incoming request.
pub fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
        version = ?request.version(),
        host = Empty,
        client_ip = Empty,
        decision = Empty,
        upstream = Empty,
    )
}

/// Attach the routing outcome to the current request span.
pub fn record_routing(host: &str, client_ip: &str, decision: &str) {
    let span = Span::current();
    span.record("host", display(host));
    span.record("client_ip", display(client_ip));
    span.record("decision", display(decision));
}

pub fn record_upstream(upstream: &str) {
    Span::current().record("upstream", display(upstream));
}
