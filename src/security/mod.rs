//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted request:
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → Forward to upstream
//!
//! Upstream response:
//!     → headers.rs (strip hop-by-hop)
//!     → Back to client
//! ```
//!
//! # Design Decisions
//! - Access control itself lives in routing::decision; this module only
//!   shapes what crosses the proxy
//! - Forwarding headers are appended, never rewritten from scratch

pub mod headers;
