//! Domain types shared by every dataset-sync crate.

use std::fmt;
use std::path::Path;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Builder keys
// ---------------------------------------------------------------------------

/// Output of the digital-land builder; always managed.
pub const DIGITAL_LAND_BUILDER_KEY: &str = "digital-land-builder/dataset/digital-land.sqlite3";

/// Output of the entity builder; always managed.
pub const ENTITY_BUILDER_KEY: &str = "entity-builder/dataset/entity.sqlite3";

/// Keys that are synced regardless of the specification list. No metadata
/// side-file is published for them.
pub const BUILDER_KEYS: [&str; 2] = [DIGITAL_LAND_BUILDER_KEY, ENTITY_BUILDER_KEY];

// ---------------------------------------------------------------------------
// ObjectKey
// ---------------------------------------------------------------------------

/// A `/`-separated object store key, e.g.
/// `conservation-area-collection/dataset/conservation-area.sqlite3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(pub String);

impl ObjectKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path segment of the key. This names both the staged and the
    /// published file.
    pub fn file_name(&self) -> Result<&str, CoreError> {
        let name = self.0.rsplit('/').next().unwrap_or_default();
        let reason = match name {
            "" => "key has an empty final segment",
            "." | ".." => "final segment is a relative path component",
            _ => return Ok(name),
        };
        Err(CoreError::InvalidKey {
            key: self.0.clone(),
            reason,
        })
    }

    /// Whether this key is one of the two canonical builder outputs.
    pub fn is_builder(&self) -> bool {
        BUILDER_KEYS.contains(&self.0.as_str())
    }

    /// Key of the companion metadata document, `<key>.json`.
    pub fn side_file_key(&self) -> ObjectKey {
        ObjectKey(format!("{}.json", self.0))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ObjectKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ObjectKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// DatasetStem
// ---------------------------------------------------------------------------

/// File name without its final extension; keys the fingerprint records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetStem(pub String);

impl DatasetStem {
    pub fn from_file_name(file_name: &str) -> Self {
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_owned());
        Self(stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetStem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DatasetStem {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// SpecificationEntry
// ---------------------------------------------------------------------------

/// One row of the dataset specification: which collection a dataset is
/// published from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificationEntry {
    pub collection: String,
    pub dataset: String,
}

impl SpecificationEntry {
    pub fn new(collection: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            dataset: dataset.into(),
        }
    }
}
