//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from TOML files and
//! from the JSON environment variables accepted by the loader.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Named upstream targets, in declaration order.
    pub upstreams: UpstreamServers,

    /// Per-host routing and access policy. Empty means every host is
    /// routed to the default upstream.
    pub hosts: HashMap<String, HostConfig>,

    /// Upstream used in unrestricted mode and by hosts without an
    /// explicit `upstream`.
    pub default_upstream: String,

    /// Trust settings for `https` upstreams.
    pub upstream_tls: UpstreamTlsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            upstreams: UpstreamServers::from(vec![(
                "litellm".to_string(),
                "http://litellm:4000".to_string(),
            )]),
            hosts: HashMap::new(),
            default_upstream: "litellm".to_string(),
            upstream_tls: UpstreamTlsConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Routing and access rules for one inbound host name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HostConfig {
    /// Upstream name to forward to. Falls back to `default_upstream`.
    #[serde(default)]
    pub upstream: Option<String>,

    /// Client addresses allowed to use this host. Empty allows everyone.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub allowed_ips: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Upstream name to URL pairs that keep the order they were declared in.
///
/// Unrestricted mode falls back to the first declared upstream, so the
/// order of a TOML table or JSON object is significant here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UpstreamServers(IndexMap<String, String>);

impl UpstreamServers {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, url)| (name.as_str(), url.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert or replace an entry. Replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.0.insert(name.into(), url.into());
    }
}

impl From<Vec<(String, String)>> for UpstreamServers {
    fn from(entries: Vec<(String, String)>) -> Self {
        Self(entries.into_iter().collect())
    }
}

/// Trust settings for `https` upstreams.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamTlsConfig {
    /// PEM file of extra CA certificates trusted in addition to the
    /// bundled webpki roots (private CAs, self-signed upstreams).
    pub ca_cert_path: Option<String>,
}

/// Timeout configuration for upstream exchanges.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for the upstream to send response headers, in seconds.
    pub upstream_response_secs: u64,

    /// How long the surviving direction of an upgraded connection may keep
    /// running after the other side closed, in seconds.
    pub upgrade_grace_secs: u64,

    /// How long shutdown waits for upgraded connections to finish.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_response_secs: 30,
            upgrade_grace_secs: 5,
            shutdown_grace_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstreams_keep_toml_order() {
        let config: ProxyConfig = toml::from_str(
            r#"
            default_upstream = "zeta"

            [upstreams]
            zeta = "http://zeta:1"
            alpha = "http://alpha:2"
            mid = "http://mid:3"
            "#,
        )
        .unwrap();

        let names: Vec<&str> = config.upstreams.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn upstreams_keep_json_order() {
        let servers: UpstreamServers =
            serde_json::from_str(r#"{"b": "http://b:1", "a": "http://a:2"}"#).unwrap();
        let names: Vec<&str> = servers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn duplicate_upstream_replaces_in_place() {
        let mut servers = UpstreamServers::default();
        servers.insert("a", "http://a:1");
        servers.insert("b", "http://b:1");
        servers.insert("a", "http://a:2");

        assert_eq!(servers.len(), 2);
        assert_eq!(servers.get("a"), Some("http://a:2"));
        assert_eq!(servers.iter().next(), Some(("a", "http://a:2")));
    }

    #[test]
    fn host_config_accepts_null_and_missing_fields() {
        let host: HostConfig = serde_json::from_str(r#"{"allowed_ips": null}"#).unwrap();
        assert_eq!(host, HostConfig::default());

        let host: HostConfig =
            serde_json::from_str(r#"{"upstream": "api", "allowed_ips": ["1.1.1.1"]}"#).unwrap();
        assert_eq!(host.upstream.as_deref(), Some("api"));
        assert_eq!(host.allowed_ips, vec!["1.1.1.1".to_string()]);
    }

    #[test]
    fn upstream_tls_section_is_optional() {
        let config: ProxyConfig = toml::from_str("default_upstream = \"litellm\"").unwrap();
        assert!(config.upstream_tls.ca_cert_path.is_none());

        let config: ProxyConfig = toml::from_str(
            r#"
            [upstream_tls]
            ca_cert_path = "/etc/hostgate/ca.pem"
            "#,
        )
        .unwrap();
        assert_eq!(config.upstream_tls.ca_cert_path.as_deref(), Some("/etc/hostgate/ca.pem"));
    }

    #[test]
    fn defaults_match_legacy_environment() {
        let config = ProxyConfig::default();
        assert_eq!(config.default_upstream, "litellm");
        assert_eq!(config.upstreams.get("litellm"), Some("http://litellm:4000"));
        assert!(config.hosts.is_empty());
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn upstreams_serialize_back_in_order() {
        let servers = UpstreamServers::from(vec![
            ("z".to_string(), "http://z:1".to_string()),
            ("a".to_string(), "http://a:1".to_string()),
        ]);
        let json = serde_json::to_string(&servers).unwrap();
        assert_eq!(json, r#"{"z":"http://z:1","a":"http://a:1"}"#);
    }
}
