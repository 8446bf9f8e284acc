//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Resolve the log filter from the environment
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins, then `LOG_LEVEL`, then `info`
//! - Initialized before configuration is loaded so loader warnings are
//!   visible; the level is therefore environment-only

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Plain level (or directive list) used when `RUST_LOG` is unset.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Calling it twice is harmless.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = fallback_directive(|key| std::env::var(key).ok());
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
    });

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Filter directive used when `RUST_LOG` is not set.
pub fn fallback_directive<F>(env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env(LOG_LEVEL_ENV)
        .map(|level| level.trim().to_ascii_lowercase())
        .filter(|level| !level.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}
