//! walship Observability
//!
//! Prometheus metrics for the WAL forwarding pipeline: records read,
//! corruption, samples emitted and dropped, series cache size and
//! evictions, and the segment currently being tailed.
//!
//! # Usage
//!
//! ```no_run
//! use walship_observability::metrics;
//!
//! // Register everything once at process start
//! metrics::init();
//!
//! // Pipeline code updates the statics directly
//! metrics::SAMPLES_EMITTED_TOTAL.inc();
//! ```
//!
//! The registry is exposed as `REGISTRY` so the embedding process can wire
//! it to whatever scrape endpoint it runs.

pub mod metrics;

pub use metrics::{init as init_metrics, REGISTRY};
