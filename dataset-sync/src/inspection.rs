//! Inspection index: every per-dataset side-file merged into
//! `inspect-data-all.json`.
//!
//! Rebuilt in full after each content-changing sync. Top-level keys are
//! merged last-writer-wins in [`MergeOrder`]; with the default
//! `DirectoryListing` order the winner on a key collision depends on the
//! filesystem.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use dataset_sync_core::layout::{INSPECTION_INDEX_FILE, SIDE_FILE_SUFFIX};
use dataset_sync_core::SyncLayout;

#[derive(Debug, Error)]
pub enum InspectionError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize inspection index: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> InspectionError {
    InspectionError::Io {
        path: path.into(),
        source,
    }
}

/// Order in which side-files are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeOrder {
    /// Whatever order the directory listing yields.
    #[default]
    DirectoryListing,
    /// Byte-wise file name order.
    Lexicographic,
}

/// What a rebuild merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    /// Top-level keys in the written index.
    pub keys: Vec<String>,
    pub merged_files: Vec<String>,
    /// Side-files that could not be read or were not JSON objects.
    pub skipped_files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InspectionIndex {
    datasets_dir: PathBuf,
    index_path: PathBuf,
    order: MergeOrder,
}

impl InspectionIndex {
    pub fn new(layout: &SyncLayout) -> Self {
        Self {
            datasets_dir: layout.datasets_dir(),
            index_path: layout.inspection_index_path(),
            order: MergeOrder::default(),
        }
    }

    pub fn with_order(mut self, order: MergeOrder) -> Self {
        self.order = order;
        self
    }

    /// Merge all side-files and overwrite the index.
    ///
    /// A side-file that fails to parse is logged and skipped.
    pub fn rebuild(&self) -> Result<IndexSummary, InspectionError> {
        let names = self.side_file_names()?;
        tracing::info!(files = ?names, "found files to process for inspections");

        let mut merged = Map::new();
        let mut summary = IndexSummary::default();
        for name in names {
            let path = self.datasets_dir.join(&name);
            match read_object(&path) {
                Ok(document) => {
                    merged.extend(document);
                    summary.merged_files.push(name);
                }
                Err(reason) => {
                    tracing::error!(
                        inspection_file = %path.display(),
                        error = %reason,
                        "failed to parse inspection file"
                    );
                    summary.skipped_files.push(name);
                }
            }
        }

        self.write_index(&merged)?;
        summary.keys = merged.keys().cloned().collect();
        tracing::info!(inspections = ?summary.keys, "refreshed inspections");
        Ok(summary)
    }

    /// Regular files ending in the side-file suffix, excluding the index.
    fn side_file_names(&self) -> Result<Vec<String>, InspectionError> {
        let dir = &self.datasets_dir;
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
            let entry = entry.map_err(|e| io_err(dir, e))?;
            let file_type = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.ends_with(SIDE_FILE_SUFFIX) && name != INSPECTION_INDEX_FILE {
                names.push(name);
            }
        }
        if self.order == MergeOrder::Lexicographic {
            names.sort();
        }
        Ok(names)
    }

    fn write_index(&self, merged: &Map<String, Value>) -> Result<(), InspectionError> {
        let path = &self.index_path;
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec(merged)?;

        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()
        };
        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(&tmp, e));
        }
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            io_err(path, e)
        })
    }
}

fn read_object(path: &Path) -> Result<Map<String, Value>, String> {
    let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
    match serde_json::from_str::<Value>(&contents).map_err(|e| e.to_string())? {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected a JSON object, found {}", kind(&other))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
