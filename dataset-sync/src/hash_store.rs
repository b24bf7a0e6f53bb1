//! Hash store: last published fingerprint per dataset.
//!
//! One `{"hash": "<fingerprint>"}` document per dataset at
//! [`SyncLayout::hash_record_path`]. Writes go through `<stem>.json.tmp`,
//! are fsynced, then renamed over the record.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dataset_sync_core::{DatasetStem, SyncLayout};

/// On-disk fingerprint record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashRecord {
    pub hash: String,
}

#[derive(Debug, Error)]
pub enum HashStoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed fingerprint record at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> HashStoreError {
    HashStoreError::Io {
        path: path.into(),
        source,
    }
}

#[derive(Debug, Clone)]
pub struct HashStore {
    layout: SyncLayout,
}

impl HashStore {
    pub fn new(layout: SyncLayout) -> Self {
        Self { layout }
    }

    pub fn record_path(&self, stem: &DatasetStem) -> PathBuf {
        self.layout.hash_record_path(stem)
    }

    /// Recorded fingerprint for `stem`, or `None` if no record exists.
    pub fn get(&self, stem: &DatasetStem) -> Result<Option<String>, HashStoreError> {
        let path = self.record_path(stem);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path, e)),
        };
        let record: HashRecord = serde_json::from_str(&contents)
            .map_err(|source| HashStoreError::Parse { path, source })?;
        Ok(Some(record.hash))
    }

    /// Write or overwrite the record for `stem`. Durable on return.
    pub fn set(&self, stem: &DatasetStem, hash: &str) -> Result<(), HashStoreError> {
        let dir = self.layout.hashes_dir();
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;

        let path = self.record_path(stem);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec(&HashRecord {
            hash: hash.to_string(),
        })
        .map_err(|source| HashStoreError::Parse {
            path: path.clone(),
            source,
        })?;

        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()
        };
        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(&tmp, e));
        }
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(&path, e));
        }
        tracing::debug!(path = %path.display(), "fingerprint record written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn stem() -> DatasetStem {
        DatasetStem::from("central-activities-zone")
    }

    fn store(root: &Path) -> HashStore {
        HashStore::new(SyncLayout::new(root, root.join("var")))
    }

    /// `{root}/datasets/hashes/central-activities-zone.json`, created with
    /// `contents`.
    fn seed_record(root: &Path, contents: &str) {
        let dir = root.join("datasets").join("hashes");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("central-activities-zone.json"), contents).unwrap();
    }

    #[test]
    fn absent_record_is_none() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(store(tmp.path()).get(&stem()).unwrap(), None);
    }

    #[test]
    fn set_then_get_returns_latest_hash() {
        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());

        store.set(&stem(), "first").unwrap();
        store.set(&stem(), "second").unwrap();

        assert_eq!(store.get(&stem()).unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn record_is_a_single_hash_field() {
        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());
        store
            .set(&stem(), "25f3a5bcc31bf2cf991d636fe2fe36ea8f9fe162")
            .unwrap();

        let path = tmp.path().join("datasets/hashes/central-activities-zone.json");
        assert_eq!(store.record_path(&stem()), path);
        let raw = fs::read_to_string(path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"hash": "25f3a5bcc31bf2cf991d636fe2fe36ea8f9fe162"})
        );
    }

    #[test]
    fn reads_records_written_by_other_tools() {
        let tmp = TempDir::new().unwrap();
        seed_record(tmp.path(), r#"{"hash": "notwhattheactualhashis"}"#);

        assert_eq!(
            store(tmp.path()).get(&stem()).unwrap().as_deref(),
            Some("notwhattheactualhashis")
        );
    }

    #[test]
    fn tmp_file_cleaned_up_after_set() {
        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());
        store.set(&stem(), "abc").unwrap();
        assert!(!store.record_path(&stem()).with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_record_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        seed_record(tmp.path(), "{not json");

        let err = store(tmp.path()).get(&stem()).unwrap_err();
        assert!(matches!(err, HashStoreError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("central-activities-zone.json"));
    }
}
