//! # dataset-sync
//!
//! Fingerprint-gated publishing of SQLite datasets from an object store.
//!
//! [`DatasetSync::process_object`] takes one object key through relevance
//! filtering, staging, an integrity check and a fingerprint comparison, and
//! only when content changed replaces the published file, refreshes the
//! inspection index and records the new fingerprint.

pub mod error;
pub mod fingerprint;
pub mod hash_store;
pub mod inspection;
pub mod integrity;
pub mod object_store;
pub mod orchestrator;
pub mod publish;
pub mod relevance;
pub mod specification;

pub use error::SyncError;
pub use fingerprint::{DbHashTool, Fingerprint, Fingerprinter, LogicalContentHasher};
pub use hash_store::HashStore;
pub use inspection::{InspectionIndex, MergeOrder};
pub use object_store::{LocalObjectStore, ObjectStore, S3ObjectStore};
pub use orchestrator::{DatasetSync, SideFileStatus, SkipReason, SyncOutcome, SyncReport};
pub use specification::{HttpSpecificationSource, SpecificationSource, StaticSpecifications};
