//! Segmented WAL Surface
//!
//! This crate implements the on-disk WAL layer for walship: segment naming
//! and discovery, the page/fragment framing format, a tailer that follows
//! the live log across rotations, and a producer-compatible writer used by
//! tests and tooling.
//!
//! ## On-disk Layout
//!
//! A WAL directory holds segment files named by eight-digit zero-padded
//! decimal integers. Each segment is a sequence of 32 KiB pages; each page
//! holds a run of fragments:
//!
//! ```text
//! Fragment:
//! ┌──────────┬───────────────┬──────────┬────────────┐
//! │ Type     │ Length        │ CRC32    │ Payload    │
//! │ (1 byte) │ (2 bytes, BE) │ (4B, BE) │ (N bytes)  │
//! └──────────┴───────────────┴──────────┴────────────┘
//! ```
//!
//! The CRC covers type, length, and payload. Fragment types: 1 = full,
//! 2 = first, 3 = middle, 4 = last; a zero type byte marks padding, which
//! runs to the end of its page. Fragments never cross a page boundary; a
//! logical record is one `full` fragment or a `first, middle*, last` run.
//! When a segment is cut, its final page is zero-padded, so finalized
//! segments are always a whole number of pages and the byte stream stays
//! page-aligned across segment boundaries.
//!
//! ## Reading Path
//!
//! ```text
//! ┌──────────────┐    bytes    ┌──────────────┐   records   ┌──────────┐
//! │  WalTailer   │ ──────────► │ RecordReader │ ──────────► │ pipeline │
//! │ (follows     │             │ (pages,      │             │          │
//! │  segments)   │             │  fragments)  │             │          │
//! └──────────────┘             └──────────────┘             └──────────┘
//! ```
//!
//! The tailer never reports end-of-stream: at the tail of the highest
//! segment it polls for growth or a successor segment until cancelled.

pub mod reader;
pub mod segment;
pub mod tailer;
pub mod writer;

pub use reader::RecordReader;
pub use segment::{list_segments, parse_segment_name, segment_file_name};
pub use tailer::{SegmentPosition, TailerConfig, WalTailer};
pub use writer::WalWriter;

/// Fixed page size within a segment.
pub const PAGE_SIZE: usize = 32 * 1024;

/// Fragment header size: type (1) + length (2) + CRC32 (4).
pub const FRAGMENT_HEADER_SIZE: usize = 7;

/// Type byte marking zero padding; the rest of the page is skipped.
pub const PADDING_BYTE: u8 = 0;

/// Fragment type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FragmentType {
    Full = 1,
    First = 2,
    Middle = 3,
    Last = 4,
}

impl FragmentType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(FragmentType::Full),
            2 => Some(FragmentType::First),
            3 => Some(FragmentType::Middle),
            4 => Some(FragmentType::Last),
            _ => None,
        }
    }
}
