//! Upgraded connection tracking.
//!
//! # Responsibilities
//! - Count relays that outlive their HTTP exchange (WebSocket and other
//!   upgraded protocols)
//! - Generate unique tunnel IDs for tracing
//! - Let shutdown wait for relays to finish, with a deadline
//!
//! Ordinary requests are drained by the HTTP server itself; only tunnels,
//! which run on detached tasks, need tracking here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::observability::metrics;

/// Relaxed ordering is enough; IDs only need to be unique.
static TUNNEL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an upgraded connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TunnelId(u64);

impl TunnelId {
    pub fn new() -> Self {
        Self(TUNNEL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TunnelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TunnelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tunnel-{}", self.0)
    }
}

/// Tracks active tunnels for graceful shutdown.
///
/// The count is published on a watch channel so `drain` can wait for it to
/// reach zero without polling.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<watch::Sender<u64>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            active: Arc::new(tx),
        }
    }

    /// Record a new tunnel. The returned guard untracks it on drop.
    pub fn track(&self) -> TunnelGuard {
        self.active.send_modify(|count| *count += 1);
        metrics::tunnel_opened();
        TunnelGuard {
            active: Arc::clone(&self.active),
            id: TunnelId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        *self.active.borrow()
    }

    /// Wait until every tunnel has closed or `deadline` elapses.
    /// Returns true when all tunnels closed in time.
    pub async fn drain(&self, deadline: Duration) -> bool {
        let mut rx = self.active.subscribe();
        let drained = tokio::time::timeout(deadline, rx.wait_for(|count| *count == 0))
            .await
            .is_ok();
        drained
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard held by a relay task for the lifetime of its tunnel.
#[derive(Debug)]
pub struct TunnelGuard {
    active: Arc<watch::Sender<u64>>,
    id: TunnelId,
}

impl TunnelGuard {
    pub fn id(&self) -> TunnelId {
        self.id
    }
}

impl Drop for TunnelGuard {
    fn drop(&mut self) {
        self.active.send_modify(|count| *count = count.saturating_sub(1));
        metrics::tunnel_closed();
        tracing::trace!(tunnel_id = %self.id, "Tunnel closed");
    }
}
