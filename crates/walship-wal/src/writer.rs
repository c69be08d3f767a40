//! Segment Writer
//!
//! Producer-compatible writer for the page/fragment WAL format. The sidecar
//! never writes the collector's WAL; this writer exists so tests and
//! tooling can build byte-exact synthetic logs, and it doubles as the
//! executable definition of the format in `crate` docs.
//!
//! ## Flush Discipline
//!
//! The current page is buffered in memory and written append-only: a flush
//! emits the not-yet-written suffix of the page, so a partially flushed
//! page can keep growing on disk without seeking. When a record does not
//! fit the remaining page space, the writer splits it into
//! `first/middle*/last` fragments; when fewer than eight bytes remain in a
//! page, they are zero-filled and the page is completed. Cutting a segment
//! pads the final page, fsyncs, and opens the next numbered file, so
//! finalized segments are always whole pages.

use crate::segment::{last_segment, segment_file_name};
use crate::{FragmentType, FRAGMENT_HEADER_SIZE, PAGE_SIZE};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use walship_core::record::{
    encode_samples, encode_series, encode_tombstones, Sample, SeriesDecl, TombstoneInterval,
};
use walship_core::Result;

/// Writes framed records into numbered segment files.
pub struct WalWriter {
    dir: PathBuf,
    segment: u64,
    file: File,

    /// Logical contents of the current page (at most `PAGE_SIZE` bytes).
    page: Vec<u8>,

    /// Prefix of `page` already written to the file.
    page_flushed: usize,
}

impl WalWriter {
    /// Open a writer in `dir`, creating the directory if needed. Writing
    /// starts in a fresh segment after the highest existing one.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let segment = match last_segment(&dir).await? {
            Some((n, _)) => n + 1,
            None => 0,
        };
        let file = create_segment(&dir, segment).await?;

        info!(segment, dir = %dir.display(), "WAL writer opened");

        Ok(Self {
            dir,
            segment,
            file,
            page: Vec::with_capacity(PAGE_SIZE),
            page_flushed: 0,
        })
    }

    /// Number of the segment currently being written.
    pub fn current_segment(&self) -> u64 {
        self.segment
    }

    /// Path of the segment currently being written.
    pub fn segment_path(&self) -> PathBuf {
        self.dir.join(segment_file_name(self.segment))
    }

    /// Append one logical record, splitting it into fragments as needed,
    /// and flush it to the file.
    pub async fn append_record(&mut self, payload: &[u8]) -> Result<()> {
        let mut rest = payload;
        let mut first = true;

        loop {
            if PAGE_SIZE - self.page.len() < FRAGMENT_HEADER_SIZE + 1 {
                self.pad_page();
                self.flush_page().await?;
            }

            let room = PAGE_SIZE - self.page.len() - FRAGMENT_HEADER_SIZE;
            let take = rest.len().min(room);
            let done = take == rest.len();

            let ftype = match (first, done) {
                (true, true) => FragmentType::Full,
                (true, false) => FragmentType::First,
                (false, false) => FragmentType::Middle,
                (false, true) => FragmentType::Last,
            };
            self.push_fragment(ftype, &rest[..take]);
            rest = &rest[take..];
            first = false;

            if self.page.len() == PAGE_SIZE {
                self.flush_page().await?;
            }
            if done {
                break;
            }
        }

        self.flush_page().await
    }

    /// Encode and append a series-declaration record.
    pub async fn append_series(&mut self, decls: &[SeriesDecl]) -> Result<()> {
        self.append_record(&encode_series(decls)).await
    }

    /// Encode and append a sample record.
    pub async fn append_samples(&mut self, samples: &[Sample]) -> Result<()> {
        self.append_record(&encode_samples(samples)).await
    }

    /// Encode and append a tombstone record.
    pub async fn append_tombstones(&mut self, intervals: &[TombstoneInterval]) -> Result<()> {
        self.append_record(&encode_tombstones(intervals)).await
    }

    /// Flush buffered bytes and fsync the current segment.
    pub async fn sync(&mut self) -> Result<()> {
        self.flush_page().await?;
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(())
    }

    /// Finalize the current segment (pad, flush, fsync) and start the next
    /// numbered one.
    pub async fn cut_segment(&mut self) -> Result<()> {
        if !self.page.is_empty() {
            self.pad_page();
        }
        self.sync().await?;

        self.segment += 1;
        self.file = create_segment(&self.dir, self.segment).await?;
        self.page.clear();
        self.page_flushed = 0;

        debug!(segment = self.segment, "cut WAL segment");
        Ok(())
    }

    fn push_fragment(&mut self, ftype: FragmentType, payload: &[u8]) {
        let len_bytes = (payload.len() as u16).to_be_bytes();

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&[ftype as u8]);
        hasher.update(&len_bytes);
        hasher.update(payload);
        let crc = hasher.finalize();

        self.page.push(ftype as u8);
        self.page.extend_from_slice(&len_bytes);
        self.page.extend_from_slice(&crc.to_be_bytes());
        self.page.extend_from_slice(payload);
    }

    fn pad_page(&mut self) {
        self.page.resize(PAGE_SIZE, 0);
    }

    async fn flush_page(&mut self) -> Result<()> {
        if self.page.len() > self.page_flushed {
            self.file.write_all(&self.page[self.page_flushed..]).await?;
            self.page_flushed = self.page.len();
        }
        if self.page.len() == PAGE_SIZE {
            self.page.clear();
            self.page_flushed = 0;
        }
        Ok(())
    }
}

async fn create_segment(dir: &Path, segment: u64) -> Result<File> {
    let path = dir.join(segment_file_name(segment));
    let file = tokio::fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&path)
        .await?;
    Ok(file)
}
