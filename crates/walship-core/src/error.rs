//! Error Types for walship
//!
//! This module defines the error type shared by the WAL reading and
//! forwarding crates.
//!
//! ## Error Categories
//!
//! ### Structural Errors
//! - `Io`: file system operation failed (fatal unless it is the tailer's
//!   EOF-at-tail wait condition, which never surfaces here)
//! - `Corrupt`: framing or payload damage detected (checksum mismatch,
//!   illegal fragment sequence, truncated payload)
//!
//! ### Lifecycle
//! - `Cancelled`: the shutdown handle fired; callers treat this as clean
//!   termination, not a failure
//!
//! ### Per-sample Errors
//! - `MissingMetricName`: a series carried no `__name__` label, so no
//!   outbound metric can be built for its samples
//!
//! ## Usage
//!
//! All fallible operations return `Result<T>`, aliased to
//! `Result<T, Error>`, so `?` propagation works across crate boundaries.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt WAL data: {0}")]
    Corrupt(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("series has no metric name label")]
    MissingMetricName,

    #[error("appender error: {0}")]
    Appender(String),
}

impl Error {
    /// True when this error represents cooperative shutdown rather than a
    /// real failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// True for damage that terminates the pipeline (no resynchronization
    /// is attempted within a segment).
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Error::Corrupt(_))
    }
}
