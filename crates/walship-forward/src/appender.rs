//! Downstream Appender Contract
//!
//! The pipeline hands every successfully translated sample to an
//! `Appender` exactly once. Batching, sharding, retry, and durability
//! against the remote backend all live behind this trait; the queue
//! manager that implements it in production is an external collaborator.
//!
//! `append` may block under back-pressure. The pipeline calls it
//! synchronously on the decode task, so back-pressure flows upstream into
//! the tailer naturally; implementations must not assume it is cheap to
//! call but must honour cancellation of their surrounding task.

use async_trait::async_trait;
use std::sync::Mutex;
use walship_core::{OutboundMetric, Result};

/// Consumer of translated samples.
#[async_trait]
pub trait Appender: Send + Sync {
    /// Accept one outbound metric. May block under back-pressure.
    async fn append(&self, metric: OutboundMetric) -> Result<()>;

    /// Short identifier for diagnostics.
    fn name(&self) -> &str;
}

/// Collects appended metrics in memory. Used by tests and useful for
/// draining a WAL into a buffer programmatically.
#[derive(Debug, Default)]
pub struct VecAppender {
    metrics: Mutex<Vec<OutboundMetric>>,
}

impl VecAppender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of metrics appended so far.
    pub fn len(&self) -> usize {
        self.metrics.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of everything appended so far.
    pub fn collected(&self) -> Vec<OutboundMetric> {
        self.metrics.lock().unwrap().clone()
    }
}

#[async_trait]
impl Appender for VecAppender {
    async fn append(&self, metric: OutboundMetric) -> Result<()> {
        self.metrics.lock().unwrap().push(metric);
        Ok(())
    }

    fn name(&self) -> &str {
        "vec"
    }
}
