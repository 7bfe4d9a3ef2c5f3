//! Shutdown coordination.
//!
//! One broadcast channel fans the stop signal out to the HTTP server,
//! housekeeping, and any other long-running task. Subscribe before
//! spawning the task that waits on the signal, or the task can miss a
//! trigger that fires first.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Subscribers that already exited are ignored.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Consume the coordinator and fire the signal on Ctrl+C.
    pub async fn trigger_on_ctrl_c(self) {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            self.trigger();
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let mut server = shutdown.subscribe();
        let mut housekeeping = shutdown.subscribe();

        shutdown.trigger();

        server.recv().await.unwrap();
        housekeeping.recv().await.unwrap();
    }

    #[tokio::test]
    async fn test_trigger_with_no_subscribers_is_harmless() {
        Shutdown::new().trigger();
    }
}
