//! Per-request access decision.
//!
//! # Responsibilities
//! - Combine host, client address and the routing table into one outcome
//! - Keep "unrestricted" and "host not in table" as distinct paths
//!
//! # Design Decisions
//! - Pure function of its inputs; no I/O, no caching of failures
//! - Allow-lists compare addresses as exact strings (no CIDR)
//! - A dangling upstream reference is answered on every request, so fixing
//!   the configuration and restarting is enough to recover

use axum::http::StatusCode;
use url::Url;

use crate::net::client_addr::ClientIp;
use crate::routing::table::RoutingTable;

/// Outcome of routing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Forward to this upstream base URL.
    Forward(Url),
    /// The host has an allow-list that does not contain the client.
    Forbidden(ClientIp, String),
    /// The host is not configured while host policies exist.
    NotFound(String),
    /// The selected upstream name is missing from the registry.
    BadGateway(String),
}

impl Decision {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Forward(_) => "forward",
            Decision::Forbidden(..) => "forbidden",
            Decision::NotFound(_) => "not_found",
            Decision::BadGateway(_) => "bad_gateway",
        }
    }

    /// Status written for a rejection. `Forward` reports 200; the real
    /// status comes from the upstream.
    pub fn status(&self) -> StatusCode {
        match self {
            Decision::Forward(_) => StatusCode::OK,
            Decision::Forbidden(..) => StatusCode::FORBIDDEN,
            Decision::NotFound(_) => StatusCode::NOT_FOUND,
            Decision::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl RoutingTable {
    /// Decide where a request for `host` from `client_ip` goes.
    pub fn decide(&self, host: &str, client_ip: &ClientIp) -> Decision {
        if self.is_unrestricted() {
            return self
                .registry
                .get(&self.default_upstream)
                .or_else(|| self.registry.first().map(|(_, url)| url))
                .map(|url| Decision::Forward(url.clone()))
                .unwrap_or_else(|| Decision::BadGateway(self.default_upstream.clone()));
        }

        let Some(policy) = self.hosts.get(host) else {
            return Decision::NotFound(host.to_string());
        };

        if !policy.allowed_ips.is_empty() && !policy.allowed_ips.contains(client_ip.as_str()) {
            return Decision::Forbidden(client_ip.clone(), host.to_string());
        }

        let name = policy.upstream.as_deref().unwrap_or(&self.default_upstream);
        match self.registry.get(name) {
            Some(url) => Decision::Forward(url.clone()),
            None => Decision::BadGateway(name.to_string()),
        }
    }
}
