//! Cancellation-aware execution context.
//!
//! A [`Context`] is handed to the listener, to every transport operation and
//! to every handler invocation. Cancelling its [`CancelHandle`] unblocks
//! pending reads and writes, which then fail with
//! [`TransportError::Cancelled`](crate::connection::TransportError::Cancelled).

use std::sync::Arc;

use tokio::sync::watch;

/// Cancels every [`Context`] created alongside it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Signal cancellation. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Execution context carrying a cancellation signal.
///
/// Cheap to clone; all clones observe the same signal.
#[derive(Debug, Clone, Default)]
pub struct Context {
    rx: Option<watch::Receiver<bool>>,
}

impl Context {
    /// A context that is never cancelled.
    pub fn background() -> Self {
        Self { rx: None }
    }

    /// A context together with the handle that cancels it.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self { rx: Some(rx) },
            CancelHandle { tx: Arc::new(tx) },
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the context is cancelled.
    ///
    /// Never resolves for a background context, or when the handle was
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };

        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
