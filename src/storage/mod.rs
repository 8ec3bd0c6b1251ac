//! Flat-file persistence for run state.
//!
//! Two small files are the entire persistence layer:
//!
//! ```text
//! data/
//! ├── last_results.csv      # Key set: one `key` column, sorted
//! └── last_daily_sent.txt   # Daily marker: single ISO date
//! ```
//!
//! Both are written atomically (temp file, then rename) so a crash mid-write
//! never leaves a half-updated file for the next run to read. Reads are
//! tolerant: anything missing or unparsable degrades to "no prior state".
//!
//! Concurrent program instances are not supported; nothing locks these
//! files. Single-instance-at-a-time scheduling is the caller's job.

pub mod daily;
pub mod state;

use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

// Re-export for convenience
pub use daily::DailyGate;
pub use state::StateStore;

/// Write bytes atomically: write to a temp file next to the target,
/// flush, then rename over it.
pub(crate) async fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read bytes, returning None if the file doesn't exist.
pub(crate) async fn read_bytes_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state/file.txt");

        write_bytes_atomic(&path, b"hello").await.unwrap();
        let data = read_bytes_optional(&path).await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));

        // No temp file left behind
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let data = read_bytes_optional(&tmp.path().join("nope.txt"))
            .await
            .unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.txt");

        write_bytes_atomic(&path, b"old").await.unwrap();
        write_bytes_atomic(&path, b"new").await.unwrap();

        let data = read_bytes_optional(&path).await.unwrap();
        assert_eq!(data, Some(b"new".to_vec()));
    }
}
