//! Header manipulation for forwarded exchanges.
//!
//! # Responsibilities
//! - Detect upgrade requests
//! - Strip hop-by-hop headers on both legs of the exchange
//! - Add X-Forwarded-For, X-Forwarded-Host, X-Forwarded-Proto
//!
//! # Design Decisions
//! - Preserve the existing X-Forwarded-For chain and append the peer
//! - X-Forwarded-Host and X-Forwarded-Proto are only set when absent, so an
//!   outer load balancer's values survive
//! - The `Upgrade` / `Connection: upgrade` pair survives on upgrade
//!   exchanges; everything else hop-by-hop is removed

use std::net::IpAddr;

use axum::http::header::{CONNECTION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");
const PROXY_CONNECTION: HeaderName = HeaderName::from_static("proxy-connection");

/// Hop-by-hop headers removed regardless of what `Connection` lists.
const HOP_BY_HOP: [HeaderName; 7] = [
    CONNECTION,
    KEEP_ALIVE,
    PROXY_CONNECTION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

/// Tokens of every `Connection` header, lowercased.
fn connection_tokens(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// True for `Connection: upgrade` together with an `Upgrade` header.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers.contains_key(UPGRADE) && connection_tokens(headers).iter().any(|t| t == "upgrade")
}

/// Remove hop-by-hop headers in place.
///
/// With `keep_upgrade`, the `Upgrade` header is kept and `Connection` is
/// reduced to `upgrade`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap, keep_upgrade: bool) {
    for token in connection_tokens(headers) {
        if keep_upgrade && token == "upgrade" {
            continue;
        }
        if let Ok(name) = HeaderName::from_bytes(token.as_bytes()) {
            headers.remove(name);
        }
    }

    let upgrade = if keep_upgrade { headers.get(UPGRADE).cloned() } else { None };

    for name in HOP_BY_HOP {
        headers.remove(name);
    }

    if let Some(protocol) = upgrade {
        headers.insert(UPGRADE, protocol);
        headers.insert(CONNECTION, HeaderValue::from_static("upgrade"));
    }
}

/// Add the standard forwarding headers for a request about to leave the
/// proxy.
pub fn append_forwarded(
    headers: &mut HeaderMap,
    peer_ip: IpAddr,
    original_host: Option<&str>,
    proto: &str,
) {
    let peer = peer_ip.to_string();
    let mut chain: Vec<&[u8]> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .map(HeaderValue::as_bytes)
        .filter(|v| !v.is_empty())
        .collect();
    chain.push(peer.as_bytes());
    let joined = chain.join(&b", "[..]);

    match HeaderValue::from_bytes(&joined) {
        Ok(value) => {
            headers.insert(X_FORWARDED_FOR, value);
        }
        Err(_) => {
            if let Ok(value) = HeaderValue::from_str(&peer) {
                headers.insert(X_FORWARDED_FOR, value);
            }
        }
    }

    if let Some(host) = original_host {
        if !headers.contains_key(X_FORWARDED_HOST) {
            if let Ok(value) = HeaderValue::from_str(host) {
                headers.insert(X_FORWARDED_HOST, value);
            }
        }
    }

    if !headers.contains_key(X_FORWARDED_PROTO) {
        if let Ok(value) = HeaderValue::from_str(proto) {
            headers.insert(X_FORWARDED_PROTO, value);
        }
    }
}
