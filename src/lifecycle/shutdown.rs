//! Shutdown coordination for the engine's background tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// One-shot shutdown latch.
///
/// Background tasks subscribe to the broadcast; the engine reads the latch
/// to refuse new registrations once shutdown has begun.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Flip the latch. Returns `true` only for the call that flipped it.
    pub fn begin(&self) -> bool {
        !self.triggered.swap(true, Ordering::AcqRel)
    }

    /// Wake every subscriber.
    pub fn notify(&self) {
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
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

    #[test]
    fn test_begin_flips_once() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        assert!(shutdown.begin());
        assert!(!shutdown.begin());
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_subscribers_are_woken() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        shutdown.notify();
        assert!(rx.recv().await.is_ok());
    }
}
