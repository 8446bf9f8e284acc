//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     ProxyConfig
//!     → table.rs (parse upstream URLs, normalize host policies)
//!     → Freeze as immutable RoutingTable behind an Arc
//!
//! Incoming Request (host, client address)
//!     → decision.rs (unrestricted / unknown host / allow-list / registry)
//!     → Return: Forward(url) or a rejection
//! ```
//!
//! # Design Decisions
//! - Table compiled at startup, immutable at runtime
//! - Exact host match, no wildcards or suffixes
//! - Deterministic: same input always yields the same decision

pub mod decision;
pub mod table;

pub use decision::Decision;
pub use table::{HostPolicy, RoutingTable, UpstreamRegistry};
