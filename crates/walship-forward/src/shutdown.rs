//! Graceful Shutdown Handle
//!
//! One cancellation signal for the whole pipeline, carried on a
//! `tokio::sync::watch` channel. Every blocking point (tailer polls, GC
//! sleeps, the decode loop) holds a receiver and unblocks as soon as the
//! handle fires; firing is idempotent and observable after the fact.

use tokio::sync::watch;

/// Cloneable trigger-and-observe handle for pipeline shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: std::sync::Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self {
            sender: std::sync::Arc::new(sender),
        }
    }

    /// Fire the shutdown signal. Safe to call more than once.
    pub fn shutdown(&self) {
        let _ = self.sender.send(true);
    }

    /// True once the signal has fired.
    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    /// A receiver for `tokio::select!` against blocking work.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }

    /// Wait until the signal fires.
    pub async fn wait(&self) {
        let mut receiver = self.subscribe();
        // wait_for returns immediately if the signal already fired
        let _ = receiver.wait_for(|fired| *fired).await;
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}
