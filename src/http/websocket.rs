//! Upgraded connection relay (WebSocket and other `Upgrade` protocols).
//!
//! # Responsibilities
//! - Take over both raw connections once the upstream answered `101`
//! - Copy bytes in both directions independently
//! - Bound how long one direction may outlive the other
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Proxy ←──── raw bytes ────→ Upstream
//! ```
//!
//! # Design Decisions
//! - Byte-level relay; frames are never parsed, so any upgraded protocol
//!   works and ping/pong/close pass through untouched
//! - When one direction ends its write side is shut down, which forwards
//!   the close to the other peer
//! - The surviving direction gets a grace period, then both sides are
//!   dropped
//! - No idle timeout on an active relay

use std::io;
use std::time::Duration;

use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::Instrument;

use crate::net::connection::TunnelGuard;

/// Which peer ended its direction first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Upstream,
}

/// How one direction of a relay ended.
#[derive(Debug)]
pub enum Direction {
    /// Reader hit EOF; bytes copied.
    Finished(u64),
    /// Read or write failed.
    Failed(io::Error),
    /// Still running when the grace period ran out.
    Abandoned,
}

impl Direction {
    fn from_result(result: io::Result<u64>) -> Self {
        match result {
            Ok(bytes) => Direction::Finished(bytes),
            Err(e) => Direction::Failed(e),
        }
    }

    pub fn bytes(&self) -> u64 {
        match self {
            Direction::Finished(bytes) => *bytes,
            _ => 0,
        }
    }
}

#[derive(Debug)]
pub struct RelayOutcome {
    pub first_closed: Side,
    pub from_client: Direction,
    pub from_upstream: Direction,
}

impl RelayOutcome {
    /// True when the second direction also ended within the grace period.
    pub fn drained(&self) -> bool {
        !matches!(self.from_client, Direction::Abandoned)
            && !matches!(self.from_upstream, Direction::Abandoned)
    }
}

/// Copy until EOF, then close the writer so the peer sees the end.
async fn pipe<R, W>(mut reader: R, mut writer: W) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let copied = tokio::io::copy(&mut reader, &mut writer).await?;
    writer.shutdown().await?;
    Ok(copied)
}

/// Relay bytes between two connections until both directions end, or one
/// ends and the other exceeds `grace`.
pub async fn relay<C, U>(client: C, upstream: U, grace: Duration) -> RelayOutcome
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (upstream_read, upstream_write) = tokio::io::split(upstream);

    let client_to_upstream = pipe(client_read, upstream_write);
    let upstream_to_client = pipe(upstream_read, client_write);
    tokio::pin!(client_to_upstream, upstream_to_client);

    tokio::select! {
        result = &mut client_to_upstream => {
            let rest = tokio::time::timeout(grace, &mut upstream_to_client).await;
            RelayOutcome {
                first_closed: Side::Client,
                from_client: Direction::from_result(result),
                from_upstream: rest.map_or(Direction::Abandoned, Direction::from_result),
            }
        }
        result = &mut upstream_to_client => {
            let rest = tokio::time::timeout(grace, &mut client_to_upstream).await;
            RelayOutcome {
                first_closed: Side::Upstream,
                from_client: rest.map_or(Direction::Abandoned, Direction::from_result),
                from_upstream: Direction::from_result(result),
            }
        }
    }
}

/// Spawn the relay for an upgraded exchange.
///
/// Both upgrades resolve only after the `101` response has been written to
/// the client, so this must run detached from the handler. The task holds
/// `guard` for its whole life and runs in the caller's span.
pub fn spawn_tunnel(
    client: OnUpgrade,
    upstream: OnUpgrade,
    grace: Duration,
    guard: TunnelGuard,
) {
    let span = tracing::Span::current();

    tokio::spawn(
        async move {
            let tunnel_id = guard.id();
            let (client, upstream) = match tokio::try_join!(client, upstream) {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(tunnel_id = %tunnel_id, error = %e, "Upgrade failed");
                    return;
                }
            };

            tracing::debug!(tunnel_id = %tunnel_id, "Tunnel established");
            let outcome = relay(TokioIo::new(client), TokioIo::new(upstream), grace).await;

            for (side, direction) in [
                (Side::Client, &outcome.from_client),
                (Side::Upstream, &outcome.from_upstream),
            ] {
                if let Direction::Failed(e) = direction {
                    tracing::debug!(tunnel_id = %tunnel_id, side = ?side, error = %e, "Tunnel direction failed");
                }
            }

            tracing::info!(
                tunnel_id = %tunnel_id,
                first_closed = ?outcome.first_closed,
                bytes_from_client = outcome.from_client.bytes(),
                bytes_from_upstream = outcome.from_upstream.bytes(),
                drained = outcome.drained(),
                "Tunnel closed"
            );
            drop(guard);
        }
        .instrument(span),
    );
}
