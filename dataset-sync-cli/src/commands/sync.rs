//! The sync command: wire collaborators from config and process one key.

use anyhow::{Context, Result};
use clap::Args;
use tracing::Dispatch;
use tracing_subscriber::{fmt, EnvFilter};

use dataset_sync::{
    DatasetSync, DbHashTool, Fingerprinter, HttpSpecificationSource, LocalObjectStore,
    LogicalContentHasher, ObjectStore, S3ObjectStore, SkipReason, SyncOutcome, SyncReport,
};

use crate::config::{FingerprintMode, SyncConfig};

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Object key, e.g. `tree-collection/dataset/tree.sqlite3`.
    #[arg(long)]
    pub key: String,

    /// Bucket holding the object.
    #[arg(long)]
    pub bucket: String,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = SyncConfig::from_env().context("invalid configuration")?;

        let store: Box<dyn ObjectStore> = match &config.local_store {
            Some(root) => Box::new(LocalObjectStore::new(root)),
            None => Box::new(S3ObjectStore::from_env().context("could not create S3 client")?),
        };
        let fingerprinter: Box<dyn Fingerprinter> = match config.fingerprint {
            FingerprintMode::DbHash => Box::new(DbHashTool::default()),
            FingerprintMode::Native => Box::new(LogicalContentHasher),
        };

        let mut sync = DatasetSync::new(
            config.layout(),
            store,
            Box::new(HttpSpecificationSource::new(&config.specification_url)),
            fingerprinter,
            logger(),
        );

        let report = sync
            .process_object(&self.key, &self.bucket)
            .with_context(|| format!("sync failed for s3://{}/{}", self.bucket, self.key))?;
        print_report(&report);
        Ok(())
    }
}

/// Log collaborator handed to the orchestrator. Writes to stderr, filtered
/// by `RUST_LOG` (default `info`).
fn logger() -> Dispatch {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    Dispatch::new(subscriber)
}

fn print_report(report: &SyncReport) {
    match &report.outcome {
        SyncOutcome::Published { fingerprint, .. } => {
            println!("published {} ({fingerprint})", report.file_name)
        }
        SyncOutcome::Skipped(SkipReason::NotManaged) => {
            println!("skipped {}: not managed", report.file_name)
        }
        SyncOutcome::Skipped(SkipReason::Unchanged) => {
            println!("skipped {}: unchanged", report.file_name)
        }
    }
}
