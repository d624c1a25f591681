//! Cooperative cancellation for row scans
//!
//! The caller holds one clone of the token and the scan producer another.
//! The producer checks the flag between rows, and a producer parked on a full
//! channel waits on `cancelled()` so that firing the token frees its
//! connection without any further polling from the consumer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Shared {
    cancelled: AtomicBool,
    waiters: Notify,
}

/// A cooperative cancellation token.
///
/// Cancellation is sticky: once set it cannot be cleared, and every clone
/// observes it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    shared: Arc<Shared>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Signal cancellation and wake every task waiting in `cancelled()`.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
        self.shared.waiters.notify_waiters();
    }

    /// Resolves once the token has been cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.shared.waiters.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel()
            // cannot slip between the check and the wait.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
