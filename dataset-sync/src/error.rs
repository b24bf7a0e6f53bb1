//! Error types for dataset-sync.

use std::path::PathBuf;

use thiserror::Error;

use dataset_sync_core::CoreError;

use crate::fingerprint::FingerprintError;
use crate::hash_store::HashStoreError;
use crate::inspection::InspectionError;
use crate::integrity::IntegrityError;
use crate::object_store::ObjectStoreError;
use crate::publish::PublishError;

/// Failures that end a sync before it reaches `Done`.
///
/// Degraded-but-successful conditions (specification fetch failure,
/// side-file fetch failure, unparseable side-files) are logged and reported
/// on the [`SyncReport`](crate::SyncReport) instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid key or an unpreparable layout directory.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("download of s3://{bucket}/{key} failed: {source}")]
    Download {
        bucket: String,
        key: String,
        #[source]
        source: ObjectStoreError,
    },

    /// The staged file is kept at `path` for diagnosis.
    #[error("staged file {path} is not safe to publish: {source}")]
    Integrity {
        path: PathBuf,
        #[source]
        source: IntegrityError,
    },

    #[error("could not fingerprint {path}: {source}")]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: FingerprintError,
    },

    #[error("publish aborted: {0}")]
    Publish(#[from] PublishError),

    #[error("inspection index rebuild failed: {0}")]
    Inspection(#[from] InspectionError),

    #[error("fingerprint record error: {0}")]
    HashStore(#[from] HashStoreError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
