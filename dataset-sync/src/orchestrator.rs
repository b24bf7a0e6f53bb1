//! Sync orchestrator: processes one object-store event end to end.
//!
//! ```text
//! CheckRelevance -> Stage -> VerifyIntegrity -> Fingerprint -> Decide
//!   -> Publish -> RefreshIndex -> RecordHash -> Done
//! ```
//!
//! `CheckRelevance` and `Decide` may end in a skip; `Stage`,
//! `VerifyIntegrity`, `Fingerprint` and `Publish` end in an error. The
//! fingerprint record is written last, so it only ever names content that
//! is already published.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::Dispatch;

use dataset_sync_core::{DatasetStem, ObjectKey, SpecificationEntry, SyncLayout};

use crate::error::{io_err, SyncError};
use crate::fingerprint::{Fingerprint, Fingerprinter};
use crate::hash_store::HashStore;
use crate::inspection::{IndexSummary, InspectionIndex, MergeOrder};
use crate::integrity::check_integrity;
use crate::object_store::ObjectStore;
use crate::publish::{publish, PublishOutcome};
use crate::relevance::is_managed;
use crate::specification::SpecificationSource;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither a builder key nor in any specification collection.
    NotManaged,
    /// Staged content fingerprint equals the recorded one.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideFileStatus {
    Fetched,
    /// Builder keys have no side-file.
    NotApplicable,
    /// Fetch failed; the published side-file is missing or stale.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Skipped(SkipReason),
    Published {
        fingerprint: Fingerprint,
        previous: Option<String>,
        publish: PublishOutcome,
        side_file: SideFileStatus,
        index: IndexSummary,
        /// Record read back from the hash store after writing; `None` if the
        /// read-back failed.
        stored_hash: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub key: String,
    pub bucket: String,
    pub file_name: String,
    pub outcome: SyncOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// DatasetSync
// ---------------------------------------------------------------------------

/// One orchestrator per process; the specification list is fetched at most
/// once per instance.
pub struct DatasetSync {
    layout: SyncLayout,
    store: Box<dyn ObjectStore>,
    source: Box<dyn SpecificationSource>,
    fingerprinter: Box<dyn Fingerprinter>,
    hashes: HashStore,
    merge_order: MergeOrder,
    specifications: Option<Vec<SpecificationEntry>>,
    logger: Dispatch,
}

impl DatasetSync {
    /// All log events of [`process_object`](Self::process_object) go to
    /// `logger`.
    pub fn new(
        layout: SyncLayout,
        store: Box<dyn ObjectStore>,
        source: Box<dyn SpecificationSource>,
        fingerprinter: Box<dyn Fingerprinter>,
        logger: Dispatch,
    ) -> Self {
        let hashes = HashStore::new(layout.clone());
        Self {
            layout,
            store,
            source,
            fingerprinter,
            hashes,
            merge_order: MergeOrder::default(),
            specifications: None,
            logger,
        }
    }

    pub fn with_merge_order(mut self, order: MergeOrder) -> Self {
        self.merge_order = order;
        self
    }

    pub fn hash_store(&self) -> &HashStore {
        &self.hashes
    }

    /// Sync `bucket`/`key` into the published directory.
    pub fn process_object(&mut self, key: &str, bucket: &str) -> Result<SyncReport, SyncError> {
        let logger = self.logger.clone();
        tracing::dispatcher::with_default(&logger, || {
            let span = tracing::info_span!("dataset_sync", key, bucket);
            let _entered = span.enter();
            self.run(ObjectKey::from(key), bucket)
        })
    }

    fn run(&mut self, key: ObjectKey, bucket: &str) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        tracing::info!("processing new object");

        let file_name = key.file_name()?.to_string();
        let report = |outcome| SyncReport {
            key: key.to_string(),
            bucket: bucket.to_string(),
            file_name: file_name.clone(),
            outcome,
            started_at,
            finished_at: Utc::now(),
        };

        // CheckRelevance
        if !self.check_relevance(&key) {
            tracing::info!("object is not subject to sync, skipping");
            return Ok(report(SyncOutcome::Skipped(SkipReason::NotManaged)));
        }

        // Stage
        self.layout.ensure_dirs()?;
        let staged = self.layout.staged_path(&file_name);
        self.stage(&key, bucket, &staged)?;

        // VerifyIntegrity
        if let Err(source) = check_integrity(&staged) {
            tracing::error!(
                path = %staged.display(),
                error = %source,
                "integrity check failed, staged file kept for inspection"
            );
            return Err(SyncError::Integrity {
                path: staged,
                source,
            });
        }

        // Fingerprint
        let fingerprint = self.fingerprinter.fingerprint(&staged).map_err(|source| {
            tracing::error!(path = %staged.display(), error = %source, "fingerprint failed");
            SyncError::Fingerprint {
                path: staged.clone(),
                source,
            }
        })?;
        let stem = DatasetStem::from_file_name(&file_name);
        let previous = self.recorded_hash(&stem);
        tracing::info!(
            new_hash = %fingerprint,
            current_hash = previous.as_deref().unwrap_or("<none>"),
            "compared fingerprints"
        );

        // Decide
        if previous.as_deref() == Some(fingerprint.as_str()) {
            tracing::info!("hashes match, no updates to data, skipping");
            discard_staged(&staged);
            return Ok(report(SyncOutcome::Skipped(SkipReason::Unchanged)));
        }

        // Publish
        let published = self.layout.published_path(&file_name);
        let side_file = self.layout.side_file_path(&file_name);
        let publish_outcome = publish(&staged, &published, &side_file)?;
        let side_file_status = self.fetch_side_file(&key, bucket, &side_file);

        // RefreshIndex
        let index = InspectionIndex::new(&self.layout)
            .with_order(self.merge_order)
            .rebuild()?;

        // RecordHash
        self.hashes.set(&stem, fingerprint.as_str())?;

        // Done
        let stored_hash = self.recorded_hash(&stem);
        tracing::info!(
            stored_hash = stored_hash.as_deref().unwrap_or("<none>"),
            "object has been updated, including hashes and inspection index"
        );

        Ok(report(SyncOutcome::Published {
            fingerprint,
            previous,
            publish: publish_outcome,
            side_file: side_file_status,
            index,
            stored_hash,
        }))
    }

    fn check_relevance(&mut self, key: &ObjectKey) -> bool {
        if key.is_builder() {
            return is_managed(key, &[]);
        }
        is_managed(key, self.specifications())
    }

    /// Specification list, fetched on first use. A failed fetch degrades to
    /// an empty list for the rest of this instance's life.
    fn specifications(&mut self) -> &[SpecificationEntry] {
        let source = &self.source;
        self.specifications.get_or_insert_with(|| match source.fetch() {
            Ok(entries) => {
                tracing::info!(count = entries.len(), "fetched specifications");
                entries
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "error fetching specifications, only builder keys will sync"
                );
                Vec::new()
            }
        })
    }

    fn stage(&self, key: &ObjectKey, bucket: &str, staged: &Path) -> Result<(), SyncError> {
        match fs::remove_file(staged) {
            Ok(()) => tracing::debug!(path = %staged.display(), "removed stale staged file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(staged, e)),
        }

        match self.store.download(bucket, key, staged) {
            Ok(bytes) => {
                tracing::info!(
                    destination = %staged.display(),
                    bytes,
                    "finished copying file"
                );
                Ok(())
            }
            Err(source) => {
                tracing::error!(
                    destination = %staged.display(),
                    error = %source,
                    "error copying file"
                );
                Err(SyncError::Download {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    source,
                })
            }
        }
    }

    /// Corrupt or unreadable records count as absent. Before the decision
    /// that means a republish; after the record is written it only leaves
    /// `stored_hash` empty.
    fn recorded_hash(&self, stem: &DatasetStem) -> Option<String> {
        self.hashes.get(stem).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring unreadable fingerprint record");
            None
        })
    }

    fn fetch_side_file(&self, key: &ObjectKey, bucket: &str, side_file: &Path) -> SideFileStatus {
        if key.is_builder() {
            return SideFileStatus::NotApplicable;
        }
        let side_key = key.side_file_key();
        match self.store.download(bucket, &side_key, side_file) {
            Ok(_) => {
                tracing::info!(side_file_key = %side_key, "fetched side-file");
                SideFileStatus::Fetched
            }
            Err(err) => {
                tracing::error!(
                    side_file_key = %side_key,
                    error = %err,
                    "error copying side-file, published data stands"
                );
                SideFileStatus::Failed
            }
        }
    }
}

fn discard_staged(staged: &Path) {
    if let Err(e) = fs::remove_file(staged) {
        tracing::warn!(path = %staged.display(), error = %e, "could not remove staged file");
    }
}
