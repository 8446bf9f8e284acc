//! Compiled routing state.
//!
//! # Responsibilities
//! - Hold the upstream registry with parsed URLs, in declaration order
//! - Hold per-host policies keyed by exact host name
//! - Remember the default upstream name
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) host and upstream lookup; the registry is an IndexMap so the
//!   first declared upstream stays first
//! - Host keys are stored as configured; lookups are case-sensitive

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use url::Url;

use crate::config::validation::parse_upstream_url;
use crate::config::{ConfigError, ProxyConfig};

/// Named upstream URLs in declaration order.
#[derive(Debug, Clone, Default)]
pub struct UpstreamRegistry {
    entries: IndexMap<String, Url>,
}

impl UpstreamRegistry {
    pub fn get(&self, name: &str) -> Option<&Url> {
        self.entries.get(name)
    }

    /// The first declared upstream.
    pub fn first(&self) -> Option<(&str, &Url)> {
        self.entries.first().map(|(n, url)| (n.as_str(), url))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.entries.iter().map(|(n, url)| (n.as_str(), url))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Url)> for UpstreamRegistry {
    fn from_iter<I: IntoIterator<Item = (String, Url)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Access and routing rule for one host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostPolicy {
    /// Explicit upstream name; `None` falls back to the default upstream.
    pub upstream: Option<String>,
    /// Allowed client addresses. Empty allows everyone.
    pub allowed_ips: HashSet<String>,
}

impl HostPolicy {
    pub fn new<I, S>(upstream: Option<&str>, allowed_ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            upstream: upstream.filter(|n| !n.is_empty()).map(str::to_string),
            allowed_ips: allowed_ips.into_iter().map(Into::into).collect(),
        }
    }
}

/// Immutable routing table consulted once per request.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    pub(crate) registry: UpstreamRegistry,
    pub(crate) hosts: HashMap<String, HostPolicy>,
    pub(crate) default_upstream: String,
}

impl RoutingTable {
    pub fn new(
        registry: UpstreamRegistry,
        hosts: HashMap<String, HostPolicy>,
        default_upstream: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            hosts,
            default_upstream: default_upstream.into(),
        }
    }

    /// Compile a validated configuration.
    ///
    /// Upstream URLs are parsed again here so a table can never hold an
    /// unusable URL even when built from an unvalidated config.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();
        let mut parsed = Vec::with_capacity(config.upstreams.len());

        for (name, raw) in config.upstreams.iter() {
            match parse_upstream_url(name, raw) {
                Ok(url) => parsed.push((name.to_string(), url)),
                Err(e) => errors.push(e),
            }
        }

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        let hosts = config
            .hosts
            .iter()
            .map(|(host, policy)| {
                (
                    host.clone(),
                    HostPolicy::new(policy.upstream.as_deref(), policy.allowed_ips.iter().cloned()),
                )
            })
            .collect();

        Ok(Self::new(
            parsed.into_iter().collect(),
            hosts,
            config.default_upstream.clone(),
        ))
    }

    /// True when no host policies are configured.
    pub fn is_unrestricted(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn registry(&self) -> &UpstreamRegistry {
        &self.registry
    }

    pub fn default_upstream(&self) -> &str {
        &self.default_upstream
    }

    pub fn host(&self, host: &str) -> Option<&HostPolicy> {
        self.hosts.get(host)
    }

    /// Host policies sorted by host name.
    pub fn hosts(&self) -> Vec<(&str, &HostPolicy)> {
        let mut hosts: Vec<_> = self.hosts.iter().map(|(h, p)| (h.as_str(), p)).collect();
        hosts.sort_by(|a, b| a.0.cmp(b.0));
        hosts
    }
}
