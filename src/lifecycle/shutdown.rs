//! Gateway shutdown: stop accepting, then drain open streams for a bounded time.
//!
//! # Design Decisions
//! - One broadcast signal; the server stops accepting when it fires
//! - Long generation streams may outlive any reasonable deadline, so the
//!   drain is cut off after `drain_timeout` rather than awaited forever

use std::io;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// How long in-flight streams may keep running after shutdown is triggered.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// How the server task ended after shutdown was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every connection finished within the deadline.
    Drained,
    /// The deadline passed with streams still open; they are abandoned.
    Abandoned,
}

/// Owns the stop signal for the listener and the drain deadline.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    drain_timeout: Duration,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::with_drain_timeout(DRAIN_TIMEOUT)
    }

    pub fn with_drain_timeout(drain_timeout: Duration) -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx, drain_timeout }
    }

    /// Receiver handed to `GatewayServer::run`.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell the server to stop accepting. Safe to call more than once.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Trigger, then wait for the server task up to the drain deadline.
    pub async fn drain(&self, server: JoinHandle<io::Result<()>>) -> io::Result<DrainOutcome> {
        self.trigger();
        tracing::info!(timeout = ?self.drain_timeout, "Draining open streams");

        match tokio::time::timeout(self.drain_timeout, server).await {
            Ok(joined) => {
                joined.map_err(io::Error::other)??;
                Ok(DrainOutcome::Drained)
            }
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.drain_timeout,
                    "Drain deadline reached, abandoning open streams"
                );
                Ok(DrainOutcome::Abandoned)
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
