//! WAL Tailer
//!
//! Presents the segmented WAL as one gap-free byte stream that never
//! signals end-of-stream until cancelled.
//!
//! ## Behavior
//!
//! - Opens at the oldest surviving segment; if the directory is empty (or
//!   missing), waits for the producer's first segment to appear.
//! - At the tail of the live segment, polls for growth with a bounded
//!   backoff and scans the directory for a successor at the slower cadence.
//! - On seeing a successor, drains the current segment with one more read
//!   round (the producer finalizes a segment before creating the next one)
//!   and then advances; it never re-checks an abandoned segment.
//! - Deletion of low-numbered segments never disturbs the reader: the open
//!   file handle stays readable, and a start gap is not an error.
//! - Cancellation makes in-flight and future reads return
//!   `Error::Cancelled` promptly.

use crate::segment;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use walship_core::{Error, Result};

/// Polling intervals for the tail of the live segment.
#[derive(Debug, Clone)]
pub struct TailerConfig {
    /// Initial delay between file-grew checks.
    pub poll_min: Duration,

    /// Backoff ceiling; also the cadence of directory scans for rotation.
    pub poll_max: Duration,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            poll_min: Duration::from_millis(50),
            poll_max: Duration::from_millis(500),
        }
    }
}

/// Cloneable handle exposing the tailer's current segment number to other
/// pipeline stages.
#[derive(Debug, Clone)]
pub struct SegmentPosition(Arc<AtomicU64>);

impl SegmentPosition {
    fn new(segment: u64) -> Self {
        Self(Arc::new(AtomicU64::new(segment)))
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, segment: u64) {
        self.0.store(segment, Ordering::Release);
    }
}

/// Follows the segmented WAL as a single byte stream.
pub struct WalTailer {
    dir: PathBuf,
    config: TailerConfig,
    file: File,
    segment: u64,
    offset: u64,
    position: SegmentPosition,

    /// Successor segment discovered by the directory scan, consumed once
    /// the current segment is drained.
    next_segment: Option<(u64, PathBuf)>,

    backoff: Duration,
    last_scan: Instant,
    shutdown: watch::Receiver<bool>,
}

impl WalTailer {
    /// Open the WAL in `dir` at the oldest surviving segment, waiting
    /// (cancellably) for the first segment if none exists yet.
    pub async fn open(dir: impl Into<PathBuf>, shutdown: watch::Receiver<bool>) -> Result<Self> {
        Self::open_with_config(dir, TailerConfig::default(), shutdown).await
    }

    pub async fn open_with_config(
        dir: impl Into<PathBuf>,
        config: TailerConfig,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let dir = dir.into();

        let mut backoff = config.poll_min;
        let (segment, path) = loop {
            if *shutdown.borrow() {
                return Err(Error::Cancelled);
            }
            if let Some(found) = segment::first_segment(&dir).await? {
                break found;
            }
            debug!(dir = %dir.display(), "waiting for first WAL segment");
            sleep_or_cancel(&mut shutdown, backoff).await?;
            backoff = (backoff * 2).min(config.poll_max);
        };

        let file = File::open(&path).await?;
        info!(segment, dir = %dir.display(), "tailing WAL");

        Ok(Self {
            dir,
            file,
            segment,
            offset: 0,
            position: SegmentPosition::new(segment),
            next_segment: None,
            backoff: config.poll_min,
            last_scan: Instant::now(),
            config,
            shutdown,
        })
    }

    /// Shared handle to the current segment number.
    pub fn position(&self) -> SegmentPosition {
        self.position.clone()
    }

    /// Number of the segment currently being read.
    pub fn current_segment(&self) -> u64 {
        self.segment
    }

    /// Byte offset within the current segment.
    pub fn segment_offset(&self) -> u64 {
        self.offset
    }

    /// Read some bytes. Returns `n > 0`, blocking at the tail of the
    /// highest segment until it grows, a successor appears, or the
    /// shutdown signal fires.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if *self.shutdown.borrow() {
                return Err(Error::Cancelled);
            }

            let n = self.file.read(buf).await?;
            if n > 0 {
                self.offset += n as u64;
                self.backoff = self.config.poll_min;
                return Ok(n);
            }

            // EOF on the current segment: advance if a successor is known
            // to exist (the segment is final by then), otherwise poll.
            if let Some((next, path)) = self.next_segment.take() {
                self.advance(next, path).await?;
                continue;
            }
            self.wait_for_growth().await?;
        }
    }

    async fn advance(&mut self, next: u64, path: PathBuf) -> Result<()> {
        match File::open(&path).await {
            Ok(file) => {
                self.file = file;
                self.segment = next;
                self.offset = 0;
                self.position.set(next);
                debug!(segment = next, "advanced to next WAL segment");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Listed but gone before open; rescan on the next poll
                warn!(segment = next, "successor segment vanished before open");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn wait_for_growth(&mut self) -> Result<()> {
        sleep_or_cancel(&mut self.shutdown, self.backoff).await?;
        self.backoff = (self.backoff * 2).min(self.config.poll_max);

        if self.last_scan.elapsed() >= self.config.poll_max {
            self.last_scan = Instant::now();
            self.next_segment = segment::next_segment_after(&self.dir, self.segment).await?;
        }
        Ok(())
    }
}

async fn sleep_or_cancel(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> Result<()> {
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        changed = shutdown.changed() => {
            if changed.is_err() || *shutdown.borrow() {
                Err(Error::Cancelled)
            } else {
                Ok(())
            }
        }
    }
}
