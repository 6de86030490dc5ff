//! Cancellation signalling for in-flight handshakes.

use std::sync::Arc;

use tokio::sync::watch;

/// Handle held by whoever may abandon a handshake.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

/// Receiving side, observed by the poll loop.
#[derive(Debug, Clone)]
pub struct CancellationReceiver {
    receiver: watch::Receiver<bool>,
}

impl CancellationToken {
    /// Creates a token and its receiver.
    #[must_use]
    pub fn new() -> (Self, CancellationReceiver) {
        let (sender, receiver) = watch::channel(false);
        (
            Self {
                sender: Arc::new(sender),
            },
            CancellationReceiver { receiver },
        )
    }

    /// Signals cancellation. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// True once [`Self::cancel`] was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

impl CancellationReceiver {
    /// A receiver that is never cancelled.
    #[must_use]
    pub fn never() -> Self {
        let (_sender, receiver) = watch::channel(false);
        Self { receiver }
    }

    /// True once cancellation was signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves when cancellation is signalled; pends forever if the token
    /// was dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_receiver() {
        let (token, receiver) = CancellationToken::new();
        assert!(!receiver.is_cancelled());

        let waiter = tokio::spawn({
            let receiver = receiver.clone();
            async move { receiver.cancelled().await }
        });
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("receiver should wake")
            .expect("task should not panic");
        assert!(receiver.is_cancelled());
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_stays_pending() {
        let receiver = CancellationReceiver::never();
        let result = tokio::time::timeout(Duration::from_secs(60), receiver.cancelled()).await;
        assert!(result.is_err());
        assert!(!receiver.is_cancelled());
    }
}
