//! Forwarder Configuration
//!
//! Controls where the WAL is read from and how eagerly the pipeline polls:
//!
//! - **wal_dir**: the collector's WAL directory (read-only for us)
//! - **gc_interval**: cadence of the series cache GC pass (default: 1 s)
//! - **poll_min / poll_max**: tailer backoff bounds at the live tail
//!   (default: 50 ms → 500 ms; `poll_max` is also the directory scan
//!   cadence for rotation detection)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use walship_wal::TailerConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwarderConfig {
    /// WAL directory to tail.
    pub wal_dir: PathBuf,

    /// Series cache GC cadence.
    #[serde(default = "default_gc_interval", with = "duration_ms")]
    pub gc_interval: Duration,

    /// Initial delay between file-grew checks at the live tail.
    #[serde(default = "default_poll_min", with = "duration_ms")]
    pub poll_min: Duration,

    /// Backoff ceiling and rotation scan cadence.
    #[serde(default = "default_poll_max", with = "duration_ms")]
    pub poll_max: Duration,
}

impl ForwarderConfig {
    pub fn new(wal_dir: impl Into<PathBuf>) -> Self {
        Self {
            wal_dir: wal_dir.into(),
            gc_interval: default_gc_interval(),
            poll_min: default_poll_min(),
            poll_max: default_poll_max(),
        }
    }

    pub(crate) fn tailer_config(&self) -> TailerConfig {
        TailerConfig {
            poll_min: self.poll_min,
            poll_max: self.poll_max,
        }
    }
}

fn default_gc_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_poll_min() -> Duration {
    Duration::from_millis(50)
}

fn default_poll_max() -> Duration {
    Duration::from_millis(500)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
