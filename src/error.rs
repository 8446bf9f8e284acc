//! Errors raised while forwarding a request upstream.
//!
//! Every variant is reported to the client as `502 Bad Gateway` with the
//! error text in the body. Configuration errors live in
//! `config::loader::ConfigError` and only occur at startup.

use std::time::Duration;

use axum::http::uri::InvalidUri;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Connect failure, refused connection, premature close and the like.
    #[error("{0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {}s", .0.as_secs())]
    UpstreamTimeout(Duration),

    #[error("invalid upstream URI: {0}")]
    InvalidUri(#[from] InvalidUri),
}

impl ProxyError {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Upstream(e) if e.is_connect() => "connect",
            ProxyError::Upstream(_) => "upstream",
            ProxyError::UpstreamTimeout(_) => "timeout",
            ProxyError::InvalidUri(_) => "invalid_uri",
        }
    }
}
