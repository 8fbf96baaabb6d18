//! Write outcomes.
//!
//! Writes are fire-and-forget: a backend starts the write and hands back a
//! [`WriteHandle`] immediately. Callers that need confirmation await it;
//! everyone else drops it. Failures are logged by the backend either way.

use crate::error::{StoreError, StoreResult};
use tokio::sync::oneshot;
use tracing::warn;

/// The eventual outcome of one write.
#[derive(Debug)]
pub struct WriteHandle {
    rx: oneshot::Receiver<StoreResult<()>>,
}

/// The backend's half of a [`WriteHandle`].
#[derive(Debug)]
pub struct WriteCompleter {
    tx: oneshot::Sender<StoreResult<()>>,
    path: String,
}

impl WriteHandle {
    /// Creates a pending write for `path`.
    pub fn pending(path: impl Into<String>) -> (WriteCompleter, Self) {
        let (tx, rx) = oneshot::channel();
        (
            WriteCompleter {
                tx,
                path: path.into(),
            },
            Self { rx },
        )
    }

    /// A write whose outcome is already known.
    pub fn completed(path: impl Into<String>, result: StoreResult<()>) -> Self {
        let (completer, handle) = Self::pending(path);
        completer.complete(result);
        handle
    }

    /// Waits for the outcome.
    pub async fn wait(self) -> StoreResult<()> {
        self.rx.await.unwrap_or(Err(StoreError::Abandoned))
    }
}

impl WriteCompleter {
    /// Reports the outcome. A failure is logged even when nobody waits.
    pub fn complete(self, result: StoreResult<()>) {
        if let Err(e) = &result {
            warn!(path = %self.path, error = %e, "write failed");
        }
        // The handle may have been dropped; that is the fire-and-forget case.
        let _ = self.tx.send(result);
    }
}
