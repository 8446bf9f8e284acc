//! Startup reporting.
//!
//! # Responsibilities
//! - Log the effective upstream registry, host policies and default
//! - Warn about host policies that point at unknown upstreams
//!
//! # Design Decisions
//! - Fail fast happens earlier, in config validation; drift found here is
//!   only reported, and answered with 502 at request time

use crate::config::validation::dangling_upstreams;
use crate::config::ProxyConfig;
use crate::routing::RoutingTable;

/// Log the routing configuration the server is about to use.
pub fn log_configuration(config: &ProxyConfig, routes: &RoutingTable) {
    for (name, url) in routes.registry().iter() {
        tracing::info!(upstream = %name, url = %url, "Upstream registered");
    }

    tracing::info!(default_upstream = %routes.default_upstream(), "Default upstream");

    if routes.is_unrestricted() {
        tracing::info!("No host policies configured, every host uses the default upstream");
    }

    for (host, policy) in routes.hosts() {
        let upstream = policy
            .upstream
            .as_deref()
            .unwrap_or_else(|| routes.default_upstream());
        let mut allowed: Vec<&str> = policy.allowed_ips.iter().map(String::as_str).collect();
        allowed.sort_unstable();

        if allowed.is_empty() {
            tracing::info!(host = %host, upstream = %upstream, "Host policy: open to all clients");
        } else {
            tracing::info!(
                host = %host,
                upstream = %upstream,
                allowed_ips = ?allowed,
                "Host policy"
            );
        }
    }

    for (host, upstream) in dangling_upstreams(config) {
        tracing::warn!(
            host = %host,
            upstream = %upstream,
            "Host policy references an unknown upstream; requests will get 502"
        );
    }

    if routes.registry().get(routes.default_upstream()).is_none() {
        if let Some((first, _)) = routes.registry().first() {
            tracing::warn!(
                default_upstream = %routes.default_upstream(),
                fallback = %first,
                "Default upstream is not registered; unrestricted mode uses the first upstream"
            );
        }
    }
}
