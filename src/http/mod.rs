//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → request.rs (request ID, host extraction)
//!     → [routing layer decides]
//!     → forward.rs (upstream exchange) or response.rs (rejection)
//!     → websocket.rs (relay, for upgraded exchanges)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use forward::Forwarder;
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
