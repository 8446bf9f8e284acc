//! Client address resolution.
//!
//! # Responsibilities
//! - Determine the effective client address used for host allow-lists
//!
//! # Precedence
//! 1. First comma-separated token of `X-Forwarded-For`, trimmed
//! 2. `X-Real-IP`, verbatim
//! 3. Transport peer address of the accepted connection
//!
//! # Trust Boundary
//! Forwarding headers are taken at face value. The proxy is meant to sit
//! behind a load balancer that overwrites them; exposed directly to
//! clients, any caller can claim any address. No parsing, validation or
//! reverse DNS is performed on header values.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use axum::http::{HeaderMap, HeaderName};

use crate::security::headers::X_FORWARDED_FOR;

pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// The effective client address, compared as a plain string against
/// allow-list entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIp(String);

impl ClientIp {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<IpAddr> for ClientIp {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl From<&str> for ClientIp {
    fn from(addr: &str) -> Self {
        Self(addr.to_string())
    }
}

/// Resolve the client address for a request. Never fails.
pub fn resolve(remote: SocketAddr, headers: &HeaderMap) -> ClientIp {
    forwarded_for(headers)
        .or_else(|| real_ip(headers))
        .map(ClientIp::new)
        .unwrap_or_else(|| ClientIp::from(remote.ip()))
}

fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn real_ip(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(X_REAL_IP)?
        .to_str()
        .ok()
        .filter(|value| !value.is_empty())
}
