//! Key-set state store.
//!
//! Persists the set of stable keys already notified, as a CSV file with a
//! single `key` column in sorted order. Older deployments stored the full
//! scraped table instead; those files are still readable, with keys
//! reconstructed by running the deriver over the stored rows. New writes
//! always use the bare-key format.

use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::models::ResidenceRecord;
use crate::pipeline::diff::KeySet;
use crate::pipeline::key::derive_key;
use crate::storage::{read_bytes_optional, write_bytes_atomic};

/// Column name marking the bare-key format.
const KEY_COLUMN: &str = "key";

/// Flat-file store for the persisted key set.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted key set.
    ///
    /// Infallible by design: a missing file, an unreadable file, or
    /// unparsable content all degrade to the empty set with a logged
    /// warning, which makes the next run treat every current key as new.
    pub async fn load(&self) -> KeySet {
        let bytes = match read_bytes_optional(&self.path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::info!("No state file at {:?}; starting fresh", self.path);
                return KeySet::new();
            }
            Err(e) => {
                log::warn!("Could not read state file {:?}: {}", self.path, e);
                return KeySet::new();
            }
        };

        match parse_state(&bytes) {
            Ok(keys) => keys,
            Err(e) => {
                log::warn!(
                    "State file {:?} is unparsable ({}); treating as empty",
                    self.path,
                    e
                );
                KeySet::new()
            }
        }
    }

    /// Overwrite the persisted state with exactly the given set.
    ///
    /// Keys are written in sorted order for reproducible diffs. The write
    /// is atomic; a failure here must reach the operator, because the sent
    /// notifications and the stored state are now out of sync.
    pub async fn save(&self, keys: &KeySet) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([KEY_COLUMN])?;
        for key in keys {
            writer.write_record([key.as_str()])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::config(format!("CSV buffer error: {e}")))?;

        write_bytes_atomic(&self.path, &bytes).await
    }
}

/// Parse persisted state in either supported format.
///
/// If a `key` column is present the file is a bare key list and that column
/// is read directly. Otherwise the file is a legacy full-record table and
/// each row goes through the key deriver.
fn parse_state(bytes: &[u8]) -> Result<KeySet> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let key_column = headers.iter().position(|h| h == KEY_COLUMN);

    let mut keys = KeySet::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        match key_column {
            Some(col) => {
                if let Some(key) = row.get(col) {
                    let key = key.trim();
                    if !key.is_empty() {
                        keys.insert(key.to_string());
                    }
                }
            }
            None => {
                let record = ResidenceRecord::from_pairs(
                    headers.iter().map(String::as_str).zip(row.iter()),
                );
                keys.insert(derive_key(&record, index).key);
            }
        }
    }

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn keys(items: &[&str]) -> KeySet {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path().join("last_results.csv"));

        let set = keys(&["etoile::paris", "https://example.com/id-3-x"]);
        store.save(&set).await.unwrap();

        assert_eq!(store.load().await, set);

        // Idempotence: save(load()) then load() yields the same set.
        let loaded = store.load().await;
        store.save(&loaded).await.unwrap();
        assert_eq!(store.load().await, set);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path().join("absent.csv"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_content_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("last_results.csv");
        tokio::fs::write(&path, b"\x00\xff\x00garbage").await.unwrap();

        let store = StateStore::new(&path);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("last_results.csv");
        tokio::fs::write(&path, b"").await.unwrap();

        let store = StateStore::new(&path);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_sorted_deterministic_output() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("last_results.csv");
        let store = StateStore::new(&path);

        store.save(&keys(&["b", "a", "c"])).await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "key\na\nb\nc\n");
    }

    #[tokio::test]
    async fn test_legacy_full_table_migration() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("last_results.csv");

        // Old format: the full scraped table, no `key` column.
        let legacy = "titre,ville,prix,url\n\
                      Résidence Étoile,Paris,650 €,https://example.com/id-1-etoile\n\
                      Le Vercors,Lyon,540 €,\n";
        tokio::fs::write(&path, legacy).await.unwrap();

        let store = StateStore::new(&path);
        let loaded = store.load().await;

        assert_eq!(
            loaded,
            keys(&["https://example.com/id-1-etoile", "le vercors::lyon"])
        );
    }

    #[tokio::test]
    async fn test_bare_format_with_extra_columns() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("last_results.csv");

        // A `key` column wins even if other columns are present.
        tokio::fs::write(&path, "seen_at,key\n2026-08-30,etoile::paris\n")
            .await
            .unwrap();

        let store = StateStore::new(&path);
        assert_eq!(store.load().await, keys(&["etoile::paris"]));
    }

    #[tokio::test]
    async fn test_no_temp_file_left_after_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("last_results.csv");
        let store = StateStore::new(&path);

        store.save(&keys(&["a"])).await.unwrap();
        assert!(!path.with_extension("tmp").exists());
    }
}
