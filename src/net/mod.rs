//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection (plain or via tls.rs)
//!     → client_addr.rs (effective client address per request)
//!     → Hand off to HTTP layer
//!
//! Upgraded connection
//!     → connection.rs (tunnel tracking until both directions close)
//! ```
//!
//! # Design Decisions
//! - The transport peer address is always available via ConnectInfo
//! - Tunnels are tracked for graceful shutdown
//! - TLS is optional and handled transparently on the listener
//! - Upstream TLS trust is built once at startup and shared by the client

pub mod client_addr;
pub mod connection;
pub mod tls;

pub use client_addr::ClientIp;
