//! Outbound Metric Representation
//!
//! This module defines `OutboundMetric` - the unit handed to the downstream
//! appender for every successfully translated sample.
//!
//! ## Lifecycle
//! An `OutboundMetric` is constructed per sample by the translation stage,
//! consumed exactly once by the appender, and never retained by the
//! pipeline. Batching, sharding, and retry all live behind the appender.
//!
//! ## Typing
//! Every sample is emitted as an untyped scalar in this revision; typed
//! reconstruction of aggregated metrics is deferred. Counter resets are not
//! tracked yet either, so `reset_timestamp_ms` always carries the
//! `NO_TIMESTAMP` sentinel.

use crate::labels::Labels;
use serde::{Deserialize, Serialize};

/// Sentinel reset timestamp meaning "unknown / not tracked".
pub const NO_TIMESTAMP: i64 = -1;

/// One translated sample, ready for the downstream appender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMetric {
    /// Metric identifier, extracted from the reserved name label.
    pub name: String,

    /// Remaining labels in their original order (the name label removed).
    pub labels: Labels,

    /// Sample value, forwarded verbatim (NaN and ±Inf included).
    pub value: f64,

    /// Sample timestamp in milliseconds since epoch.
    pub timestamp_ms: i64,

    /// Reset timestamp hint; always `NO_TIMESTAMP` in this revision.
    pub reset_timestamp_ms: i64,
}
