//! Cooperative shutdown signal shared across pipeline stages (§4.9, §5).
//!
//! Generalizes the teacher's `CrawlEventBus` shutdown handshake — an
//! `AtomicBool` flag paired with a `tokio::sync::Notify` so waiters don't
//! have to poll — into a standalone token with no event bus to piggy-back
//! on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct ShutdownToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    triggered: AtomicBool,
    notify: Notify,
}

impl ShutdownToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.inner.triggered.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Suspend until `trigger` is called, or return immediately if it
    /// already has been.
    pub async fn cancelled(&self) {
        if self.is_triggered() {
            return;
        }
        self.inner.notify.notified().await;
    }
}

/// Install a SIGINT (Ctrl-C) handler that triggers `token`. Spawns a
/// background task; intended to be called once at controller startup.
pub fn install_ctrl_c_handler(token: ShutdownToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("shutdown signal received");
            token.trigger();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_resolves_after_trigger() {
        let token = ShutdownToken::new();
        assert!(!token.is_triggered());

        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });

        token.trigger();
        handle.await.unwrap();
        assert!(token.is_triggered());
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_if_already_triggered() {
        let token = ShutdownToken::new();
        token.trigger();
        tokio::time::timeout(std::time::Duration::from_millis(50), token.cancelled())
            .await
            .expect("should not block");
    }
}
