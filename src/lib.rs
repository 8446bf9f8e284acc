//! Host-aware reverse proxy library.
//!
//! Requests are routed by host name to named upstreams, optionally gated by
//! a per-host client address allow-list, and forwarded with streaming
//! bodies and transparent protocol upgrades.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Decision, RoutingTable};
