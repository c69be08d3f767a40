//! Segment Naming and Discovery
//!
//! Read-only view of the WAL directory: an ordered set of numbered segment
//! files owned by the producer. The producer creates new high-numbered
//! segments and deletes the lowest-numbered ones; this module only lists
//! and resolves them.
//!
//! Foreign files in the directory (lock files, checkpoints, temp files)
//! are ignored. A directory that does not exist yet lists as empty, so a
//! sidecar started before the collector's first flush simply waits.

use std::path::{Path, PathBuf};
use walship_core::Result;

/// Width of a segment file name: eight zero-padded decimal digits.
const SEGMENT_NAME_LEN: usize = 8;

/// File name for segment `n`, e.g. `00000042`.
pub fn segment_file_name(n: u64) -> String {
    format!("{:08}", n)
}

/// Parse a segment file name back to its number. Returns `None` for
/// anything that is not exactly eight decimal digits.
pub fn parse_segment_name(name: &str) -> Option<u64> {
    if name.len() != SEGMENT_NAME_LEN || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

/// List all segments in `dir`, sorted ascending by number.
///
/// Tolerates entries disappearing between `read_dir` and `stat`; a missing
/// directory lists as empty.
pub async fn list_segments(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut rd = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut segments = Vec::new();
    while let Some(entry) = rd.next_entry().await? {
        if let Some(n) = entry
            .file_name()
            .to_str()
            .and_then(parse_segment_name)
        {
            segments.push((n, entry.path()));
        }
    }

    segments.sort_by_key(|(n, _)| *n);
    Ok(segments)
}

/// The oldest surviving segment, if any.
pub async fn first_segment(dir: &Path) -> Result<Option<(u64, PathBuf)>> {
    Ok(list_segments(dir).await?.into_iter().next())
}

/// The newest segment, if any.
pub async fn last_segment(dir: &Path) -> Result<Option<(u64, PathBuf)>> {
    Ok(list_segments(dir).await?.into_iter().next_back())
}

/// The smallest segment numbered strictly greater than `current`.
///
/// Usually `current + 1`; a larger number means the producer truncated
/// segments this reader had not reached yet.
pub async fn next_segment_after(dir: &Path, current: u64) -> Result<Option<(u64, PathBuf)>> {
    Ok(list_segments(dir)
        .await?
        .into_iter()
        .find(|(n, _)| *n > current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn touch(dir: &Path, name: &str) {
        tokio::fs::write(dir.join(name), b"").await.unwrap();
    }

    // ---------------------------------------------------------------
    // Name parsing
    // ---------------------------------------------------------------

    #[test]
    fn test_segment_file_name_zero_padded() {
        assert_eq!(segment_file_name(0), "00000000");
        assert_eq!(segment_file_name(42), "00000042");
        assert_eq!(segment_file_name(99_999_999), "99999999");
    }

    #[test]
    fn test_parse_valid_names() {
        assert_eq!(parse_segment_name("00000000"), Some(0));
        assert_eq!(parse_segment_name("00000042"), Some(42));
        assert_eq!(parse_segment_name("12345678"), Some(12_345_678));
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert_eq!(parse_segment_name(""), None);
        assert_eq!(parse_segment_name("0000001"), None);
        assert_eq!(parse_segment_name("000000001"), None);
        assert_eq!(parse_segment_name("0000000x"), None);
        assert_eq!(parse_segment_name("lock"), None);
        assert_eq!(parse_segment_name("checkpoint.000001"), None);
    }

    #[test]
    fn test_name_roundtrip() {
        for n in [0, 1, 7, 1000, 99_999_999] {
            assert_eq!(parse_segment_name(&segment_file_name(n)), Some(n));
        }
    }

    // ---------------------------------------------------------------
    // Directory listing
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn test_list_segments_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "00000002").await;
        touch(dir.path(), "00000000").await;
        touch(dir.path(), "00000010").await;
        touch(dir.path(), "lock").await;
        touch(dir.path(), "not-a-segment").await;

        let segments = list_segments(dir.path()).await.unwrap();
        let numbers: Vec<u64> = segments.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![0, 2, 10]);
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("never-created");
        assert!(list_segments(&gone).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_and_last_segment() {
        let dir = TempDir::new().unwrap();
        assert!(first_segment(dir.path()).await.unwrap().is_none());
        assert!(last_segment(dir.path()).await.unwrap().is_none());

        touch(dir.path(), "00000003").await;
        touch(dir.path(), "00000007").await;

        assert_eq!(first_segment(dir.path()).await.unwrap().unwrap().0, 3);
        assert_eq!(last_segment(dir.path()).await.unwrap().unwrap().0, 7);
    }

    #[tokio::test]
    async fn test_next_segment_after() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "00000001").await;
        touch(dir.path(), "00000004").await;

        assert_eq!(next_segment_after(dir.path(), 0).await.unwrap().unwrap().0, 1);
        assert_eq!(next_segment_after(dir.path(), 1).await.unwrap().unwrap().0, 4);
        assert!(next_segment_after(dir.path(), 4).await.unwrap().is_none());
    }
}
