//! dataset-sync: publish one dataset object from the object store.
//!
//! # Usage
//!
//! ```text
//! dataset-sync --key <KEY> --bucket <BUCKET>
//! ```
//!
//! Paths, the specification URL, the fingerprint tool and the object store
//! backend come from `DATASET_SYNC_*` environment variables (see
//! [`config`]). Exit status is 0 when the object was published or skipped,
//! 1 when the sync failed, 2 on usage errors.

mod commands;
mod config;

use std::process::ExitCode;

use clap::Parser;

use commands::sync::SyncArgs;

/// Exit status for a sync that ended in an error.
const SYNC_FAILURE: u8 = 1;

#[derive(Parser, Debug)]
#[command(
    name = "dataset-sync",
    version,
    about = "Sync a dataset object into the published datasets directory",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    sync: SyncArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.sync.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(SYNC_FAILURE)
        }
    }
}
