//! Cancellable live subscriptions.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::{BackendError, Snapshot};

/// Sending half handed to a backend's delivery machinery.
pub type SnapshotSender = mpsc::UnboundedSender<Result<Snapshot, BackendError>>;

/// A live subscription to a [`ListenTarget`](super::ListenTarget).
///
/// Each item is the complete current result set. The subscription ends when
/// it is disposed or dropped, or when the backend reports an error.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Result<Snapshot, BackendError>>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Pair a receiver with the hook that tears the listener down.
    pub fn new(
        rx: mpsc::UnboundedReceiver<Result<Snapshot, BackendError>>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            rx,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription that yields one error and ends.
    #[must_use]
    pub fn failed(error: BackendError) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Err(error));
        Self { rx, cancel: None }
    }

    /// Wait for the next delivery; `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<Result<Snapshot, BackendError>> {
        self.rx.recv().await
    }

    /// Stop listening.
    pub fn dispose(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.rx.close();
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Stream for Subscription {
    type Item = Result<Snapshot, BackendError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}
