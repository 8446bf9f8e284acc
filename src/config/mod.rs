//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → loader.rs (TOML file, then UPSTREAM_SERVERS / SERVER_CONFIG /
//!       DEFAULT_UPSTREAM / PORT from the environment)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into routing::RoutingTable and shared via Arc
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a process restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{
    HostConfig, ListenerConfig, ProxyConfig, TimeoutConfig, UpstreamServers, UpstreamTlsConfig,
};
