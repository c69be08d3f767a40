//! walship Forwarding Pipeline
//!
//! This crate turns the raw WAL surface of `walship-wal` into a stream of
//! outbound metrics:
//!
//! 1. **SeriesCache** resolves each sample's numeric ref to its labelled
//!    identity and evicts identities the producer has truncated away.
//! 2. **translate** builds the outbound metric (name extracted, labels
//!    carried over, value and timestamp verbatim).
//! 3. **Appender** is the collaborator contract the environment injects;
//!    the production queue manager lives behind it.
//! 4. **WalForwarder** orchestrates tailer → reader → dispatch → append
//!    under one shutdown signal.
//!
//! Per-sample problems (unknown ref, missing metric name) are logged,
//! counted, and dropped; structural problems (corruption, I/O) stop the
//! pipeline.

pub mod appender;
pub mod config;
pub mod pipeline;
pub mod series_cache;
pub mod shutdown;
pub mod translate;

pub use appender::{Appender, VecAppender};
pub use config::ForwarderConfig;
pub use pipeline::WalForwarder;
pub use series_cache::SeriesCache;
pub use shutdown::ShutdownHandle;
pub use translate::translate;
