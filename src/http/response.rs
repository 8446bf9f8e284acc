//! Responses written by the proxy itself.
//!
//! # Design Decisions
//! - Rejections never contact an upstream
//! - Bodies are short plain text naming the offending value
//! - Upstream failures before headers map to 502; the error text is
//!   included for operators

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;

use crate::error::ProxyError;
use crate::net::client_addr::ClientIp;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Plain text response with the given status.
pub fn plain_text(status: StatusCode, body: impl Into<String>) -> Response {
    let mut response = Response::new(Body::from(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
}

pub fn forbidden(ip: &ClientIp, host: &str) -> Response {
    plain_text(
        StatusCode::FORBIDDEN,
        format!("403 Forbidden: IP {} not allowed for {}", ip, host),
    )
}

pub fn not_found(host: &str) -> Response {
    plain_text(
        StatusCode::NOT_FOUND,
        format!("404 Not Found: Host {} not configured", host),
    )
}

pub fn upstream_unconfigured(name: &str) -> Response {
    plain_text(
        StatusCode::BAD_GATEWAY,
        format!("502 Bad Gateway: Upstream '{}' not configured", name),
    )
}

pub fn bad_gateway(err: &ProxyError) -> Response {
    plain_text(StatusCode::BAD_GATEWAY, format!("Bad Gateway: {}", err))
}
