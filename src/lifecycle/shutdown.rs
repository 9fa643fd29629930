//! Shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Coordinator for cancelling long waits.
///
/// Cloned into every component that waits on the network. Subscribers that
/// arrive after the signal see it through `is_triggered`.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been triggered, including before the call.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        if self.is_triggered() {
            return;
        }
        // A closed or lagged channel also means the signal went out.
        let _ = rx.recv().await;
    }

    /// Get the number of active subscribers (waits still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shutdown")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_after_trigger_returns() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        tokio::time::timeout(Duration::from_millis(100), shutdown.wait())
            .await
            .expect("wait should return after trigger");
    }

    #[tokio::test]
    async fn test_clones_share_signal() {
        let shutdown = Shutdown::new();
        let waiter = shutdown.clone();
        let task = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.trigger();
        tokio::time::timeout(Duration::from_millis(500), task)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
