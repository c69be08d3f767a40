//! walship Core Types
//!
//! Leaf crate of the walship workspace: the labelled series identity, the
//! payload codec for the collector's three WAL record kinds, the outbound
//! metric handed to the downstream appender, and the shared error type.
//!
//! Everything here is pure data and codec logic; file handling, framing,
//! and the forwarding pipeline live in `walship-wal` and `walship-forward`.

pub mod error;
pub mod labels;
pub mod metric;
pub mod record;
pub mod varint;

pub use error::{Error, Result};
pub use labels::{Label, Labels, METRIC_NAME_LABEL};
pub use metric::{OutboundMetric, NO_TIMESTAMP};
pub use record::{Sample, SeriesDecl, TombstoneInterval, WalRecord};
