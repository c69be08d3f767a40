//! Record Reader
//!
//! Converts the tailer's byte stream into a sequence of complete logical
//! records, handling page alignment, fragment reassembly, and checksum
//! verification.
//!
//! ## Algorithm
//!
//! The reader walks the stream one 32 KiB page at a time, pulling bytes
//! from the tailer on demand. Within a page it parses fragments: the
//! checksum (over type, length, and payload) is verified for each one;
//! `full` yields a record immediately, `first`/`middle`/`last` runs are
//! accumulated and yielded on `last`. A zero type byte marks padding and
//! advances to the next page, as does a page tail too small to hold a
//! header. A fragment whose length would cross the page boundary, a
//! checksum mismatch, or an out-of-order fragment type is `Corrupt`; no
//! resynchronization is attempted.
//!
//! A `first` fragment with no `last` yet is not corruption: the reader
//! simply stays blocked in the tailer until the producer writes more, so
//! the wait-at-tail semantics compose with framing.

use crate::tailer::{SegmentPosition, WalTailer};
use crate::{FragmentType, FRAGMENT_HEADER_SIZE, PADDING_BYTE, PAGE_SIZE};
use bytes::{Bytes, BytesMut};
use walship_core::{Error, Result};

/// Yields complete logical records from a tailed WAL.
pub struct RecordReader {
    tailer: WalTailer,

    /// Scratch buffer holding the page currently being parsed.
    page: Vec<u8>,

    /// Bytes of the current page read from the tailer so far.
    page_len: usize,

    /// Parse cursor within the current page.
    page_pos: usize,

    /// Accumulator for a first/middle*/last run.
    record: BytesMut,

    /// True while a partial record is being accumulated.
    pending: bool,
}

impl RecordReader {
    pub fn new(tailer: WalTailer) -> Self {
        Self {
            tailer,
            page: vec![0u8; PAGE_SIZE],
            page_len: 0,
            page_pos: 0,
            record: BytesMut::new(),
            pending: false,
        }
    }

    /// Number of the segment the underlying tailer is positioned in.
    pub fn current_segment(&self) -> u64 {
        self.tailer.current_segment()
    }

    /// Shared handle to the tailer's current segment number.
    pub fn position(&self) -> SegmentPosition {
        self.tailer.position()
    }

    /// Read the next complete logical record, blocking at the live tail
    /// until one is available or the shutdown signal fires.
    pub async fn next_record(&mut self) -> Result<Bytes> {
        loop {
            if self.page_pos == PAGE_SIZE {
                self.page_pos = 0;
                self.page_len = 0;
            }

            // A fragment needs its header plus at least one payload byte;
            // smaller page tails are zero-filled by the writer.
            if PAGE_SIZE - self.page_pos < FRAGMENT_HEADER_SIZE + 1 {
                self.fill_to(PAGE_SIZE).await?;
                self.page_pos = PAGE_SIZE;
                continue;
            }

            self.fill_to(self.page_pos + 1).await?;
            let type_byte = self.page[self.page_pos];
            if type_byte == PADDING_BYTE {
                // Padding runs to the end of its page
                self.fill_to(PAGE_SIZE).await?;
                self.page_pos = PAGE_SIZE;
                continue;
            }
            let ftype = FragmentType::from_u8(type_byte)
                .ok_or_else(|| Error::Corrupt(format!("invalid fragment type: {}", type_byte)))?;

            self.fill_to(self.page_pos + FRAGMENT_HEADER_SIZE).await?;
            let len =
                u16::from_be_bytes([self.page[self.page_pos + 1], self.page[self.page_pos + 2]])
                    as usize;
            let stored_crc = u32::from_be_bytes([
                self.page[self.page_pos + 3],
                self.page[self.page_pos + 4],
                self.page[self.page_pos + 5],
                self.page[self.page_pos + 6],
            ]);

            if len > PAGE_SIZE - self.page_pos - FRAGMENT_HEADER_SIZE {
                return Err(Error::Corrupt(format!(
                    "fragment of {} bytes crosses page boundary",
                    len
                )));
            }

            let payload_start = self.page_pos + FRAGMENT_HEADER_SIZE;
            self.fill_to(payload_start + len).await?;
            let payload = &self.page[payload_start..payload_start + len];

            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&self.page[self.page_pos..self.page_pos + 3]);
            hasher.update(payload);
            if hasher.finalize() != stored_crc {
                return Err(Error::Corrupt("fragment checksum mismatch".to_string()));
            }

            self.page_pos = payload_start + len;

            match ftype {
                FragmentType::Full => {
                    if self.pending {
                        return Err(Error::Corrupt(
                            "full fragment while a record is in progress".to_string(),
                        ));
                    }
                    return Ok(Bytes::copy_from_slice(payload));
                }
                FragmentType::First => {
                    if self.pending {
                        return Err(Error::Corrupt(
                            "first fragment while a record is in progress".to_string(),
                        ));
                    }
                    self.pending = true;
                    self.record.clear();
                    self.record.extend_from_slice(payload);
                }
                FragmentType::Middle => {
                    if !self.pending {
                        return Err(Error::Corrupt(
                            "middle fragment without a preceding first".to_string(),
                        ));
                    }
                    self.record.extend_from_slice(payload);
                }
                FragmentType::Last => {
                    if !self.pending {
                        return Err(Error::Corrupt(
                            "last fragment without a preceding first".to_string(),
                        ));
                    }
                    self.record.extend_from_slice(payload);
                    self.pending = false;
                    return Ok(self.record.split().freeze());
                }
            }
        }
    }

    /// Pull bytes from the tailer until `target` bytes of the current page
    /// are available. Blocks at the live tail; cancellation propagates.
    async fn fill_to(&mut self, target: usize) -> Result<()> {
        while self.page_len < target {
            let n = self.tailer.read(&mut self.page[self.page_len..PAGE_SIZE]).await?;
            self.page_len += n;
        }
        Ok(())
    }
}
