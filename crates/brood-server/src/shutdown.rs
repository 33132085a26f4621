//! Cooperative shutdown signal
//!
//! Long-polling reads, proxy accept loops, and worker supervision tasks all
//! run until the supervisor shuts down. They hold a [`Shutdown`] handle and
//! select on [`Shutdown::cancelled`] next to their real work.

use std::sync::Arc;
use tokio::sync::watch;

/// Shared shutdown state. Cloning is cheap; all clones observe the same
/// signal.
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Create a new signal in the running state.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Shutdown {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Trip the signal. Wakes every pending `cancelled()` future.
    pub fn trigger(&self) {
        // Send only fails when every receiver is gone, which is fine.
        let _ = self.tx.send(true);
    }

    /// Whether shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested. Resolves immediately if it
    /// already was.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // wait_for returns immediately when the value already matches.
        let _ = rx.wait_for(|stopped| *stopped).await;
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
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_wakes_waiters() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_cancelled());

        let waiter = shutdown.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_after_trigger_resolves_immediately() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        tokio::time::timeout(Duration::from_millis(100), shutdown.cancelled())
            .await
            .expect("already-tripped signal should not block");
    }
}
