//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every upstream URL is an absolute `http://` or `https://` URL
//! - Detect drift between host policies and the upstream registry
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - A host naming an unknown upstream is only a warning here; it is
//!   answered with 502 on every request until the configuration is fixed

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No upstream servers are configured.
    NoUpstreams,
    /// An upstream has an empty name.
    EmptyUpstreamName,
    /// An upstream URL could not be parsed.
    InvalidUpstreamUrl { name: String, url: String, reason: String },
    /// An upstream URL uses a scheme the forwarder cannot speak.
    UnsupportedScheme { name: String, scheme: String },
    /// The listener bind address is not a socket address.
    InvalidBindAddress(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NoUpstreams => write!(f, "at least one upstream must be configured"),
            ValidationError::EmptyUpstreamName => write!(f, "upstream names must not be empty"),
            ValidationError::InvalidUpstreamUrl { name, url, reason } => {
                write!(f, "upstream '{}' has invalid URL '{}': {}", name, url, reason)
            }
            ValidationError::UnsupportedScheme { name, scheme } => {
                write!(f, "upstream '{}' uses unsupported scheme '{}' (only http and https)", name, scheme)
            }
            ValidationError::InvalidBindAddress(addr) => {
                write!(f, "invalid listener bind address '{}'", addr)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.upstreams.is_empty() {
        errors.push(ValidationError::NoUpstreams);
    }

    for (name, raw) in config.upstreams.iter() {
        if name.is_empty() {
            errors.push(ValidationError::EmptyUpstreamName);
        }
        if let Err(e) = parse_upstream_url(name, raw) {
            errors.push(e);
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse one upstream URL, accepting only absolute `http://` or `https://`
/// URLs with a host.
pub fn parse_upstream_url(name: &str, raw: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw).map_err(|e| ValidationError::InvalidUpstreamUrl {
        name: name.to_string(),
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::UnsupportedScheme {
            name: name.to_string(),
            scheme: url.scheme().to_string(),
        });
    }

    if url.host_str().is_none() {
        return Err(ValidationError::InvalidUpstreamUrl {
            name: name.to_string(),
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

/// Host policies whose upstream (explicit or defaulted) is not in the
/// registry, as `(host, upstream)` pairs sorted by host.
pub fn dangling_upstreams(config: &ProxyConfig) -> Vec<(String, String)> {
    let mut dangling: Vec<(String, String)> = config
        .hosts
        .iter()
        .filter_map(|(host, policy)| {
            let upstream = policy
                .upstream
                .as_deref()
                .filter(|name| !name.is_empty())
                .unwrap_or(&config.default_upstream);
            (!config.upstreams.contains(upstream)).then(|| (host.clone(), upstream.to_string()))
        })
        .collect();
    dangling.sort();
    dangling
}
