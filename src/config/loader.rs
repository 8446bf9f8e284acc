//! Configuration loading from disk and environment.
//!
//! Sources are layered, later ones overriding earlier ones:
//! built-in defaults, an optional TOML file, then the environment variables
//! `UPSTREAM_SERVERS`, `SERVER_CONFIG`, `DEFAULT_UPSTREAM` and `PORT`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::{HostConfig, ProxyConfig, UpstreamServers};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the TOML file when `--config` is not given.
pub const CONFIG_PATH_ENV: &str = "HOSTGATE_CONFIG";
/// JSON object of upstream name to URL.
pub const UPSTREAM_SERVERS_ENV: &str = "UPSTREAM_SERVERS";
/// JSON object of host name to `{ "upstream": .., "allowed_ips": [..] }`.
pub const SERVER_CONFIG_ENV: &str = "SERVER_CONFIG";
/// Name of the default upstream.
pub const DEFAULT_UPSTREAM_ENV: &str = "DEFAULT_UPSTREAM";
/// Listening port; binds all interfaces.
pub const PORT_ENV: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
    #[error("Upstream TLS setup failed: {0}")]
    UpstreamTls(#[source] std::io::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from the process environment and an optional file.
pub fn load(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    load_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an explicit environment lookup.
///
/// `path` wins over `HOSTGATE_CONFIG`. Without either, the defaults are the
/// starting point.
pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| env(CONFIG_PATH_ENV).map(PathBuf::from));

    let mut config = match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration file");
            read_file(&path)?
        }
        None => ProxyConfig::default(),
    };

    apply_env(&mut config, env);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment variables on top of a configuration.
///
/// A malformed JSON variable is logged and ignored, leaving the previous
/// value in place.
pub fn apply_env<F>(config: &mut ProxyConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = env(UPSTREAM_SERVERS_ENV) {
        match serde_json::from_str::<UpstreamServers>(&raw) {
            Ok(upstreams) => config.upstreams = upstreams,
            Err(e) => tracing::warn!(
                var = UPSTREAM_SERVERS_ENV,
                error = %e,
                "Ignoring malformed JSON in environment"
            ),
        }
    }

    if let Some(raw) = env(SERVER_CONFIG_ENV) {
        match serde_json::from_str::<HashMap<String, HostConfig>>(&raw) {
            Ok(hosts) => config.hosts = hosts,
            Err(e) => tracing::warn!(
                var = SERVER_CONFIG_ENV,
                error = %e,
                "Ignoring malformed JSON in environment"
            ),
        }
    }

    if let Some(name) = env(DEFAULT_UPSTREAM_ENV).filter(|v| !v.is_empty()) {
        config.default_upstream = name;
    }

    if let Some(port) = env(PORT_ENV) {
        match port.trim().parse::<u16>() {
            Ok(port) => config.listener.bind_address = format!("0.0.0.0:{}", port),
            Err(_) => tracing::warn!(var = PORT_ENV, value = %port, "Ignoring invalid port"),
        }
    }
}

fn read_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}
