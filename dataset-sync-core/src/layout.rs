//! Filesystem layout for a sync run.
//!
//! ```text
//! {mount}/datasets/                       published files, side-files, index
//! {mount}/datasets/inspect-data-all.json  merged inspection index
//! {mount}/datasets/hashes/{stem}.json     fingerprint records
//! {temp}/{file_name}                      staging area
//! ```
//!
//! Every path is derived from the dataset name, so syncs of different
//! datasets never touch the same file.

use std::path::{Path, PathBuf};

use crate::error::{io_err, CoreError};
use crate::types::DatasetStem;

pub const DEFAULT_MOUNT_DIR: &str = "/mnt";
pub const DEFAULT_TEMP_DIR: &str = "var";

pub const DATASETS_DIR: &str = "datasets";
pub const HASHES_DIR: &str = "hashes";

/// Suffix shared by metadata side-files, fingerprint records and the index.
pub const SIDE_FILE_SUFFIX: &str = ".json";

/// Name of the consolidated inspection index inside the datasets directory.
pub const INSPECTION_INDEX_FILE: &str = "inspect-data-all.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncLayout {
    mount_dir: PathBuf,
    temp_dir: PathBuf,
}

impl Default for SyncLayout {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNT_DIR, DEFAULT_TEMP_DIR)
    }
}

impl SyncLayout {
    pub fn new(mount_dir: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            mount_dir: mount_dir.into(),
            temp_dir: temp_dir.into(),
        }
    }

    pub fn mount_dir(&self) -> &Path {
        &self.mount_dir
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn datasets_dir(&self) -> PathBuf {
        self.mount_dir.join(DATASETS_DIR)
    }

    pub fn hashes_dir(&self) -> PathBuf {
        self.datasets_dir().join(HASHES_DIR)
    }

    pub fn staged_path(&self, file_name: &str) -> PathBuf {
        self.temp_dir.join(file_name)
    }

    pub fn published_path(&self, file_name: &str) -> PathBuf {
        self.datasets_dir().join(file_name)
    }

    /// `{datasets}/{file_name}.json`
    pub fn side_file_path(&self, file_name: &str) -> PathBuf {
        self.datasets_dir()
            .join(format!("{file_name}{SIDE_FILE_SUFFIX}"))
    }

    pub fn hash_record_path(&self, stem: &DatasetStem) -> PathBuf {
        self.hashes_dir().join(format!("{stem}{SIDE_FILE_SUFFIX}"))
    }

    pub fn inspection_index_path(&self) -> PathBuf {
        self.datasets_dir().join(INSPECTION_INDEX_FILE)
    }

    /// Create the staging, datasets and hashes directories if missing.
    pub fn ensure_dirs(&self) -> Result<(), CoreError> {
        for dir in [self.temp_dir.clone(), self.datasets_dir(), self.hashes_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
        Ok(())
    }
}
