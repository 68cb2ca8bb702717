//! Cancellable background tasks.
//!
//! The engine has two suspension points (the generation request and the
//! reveal delay). Each runs as a [`ScheduledTask`] that is aborted when the
//! handle is cancelled or dropped.

use std::{future::Future, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

/// Explicit cancellation handle for a spawned task.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Runs `future` on the current tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    /// Sends `event` on `tx` once `delay` has elapsed.
    pub fn after<T>(delay: Duration, tx: mpsc::Sender<T>, event: T) -> Self
    where
        T: Send + 'static,
    {
        Self::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(event).await.is_err() {
                debug!("Scheduled event dropped: receiver closed.");
            }
        })
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
