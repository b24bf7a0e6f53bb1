//! Replace the published copy of a dataset with a validated staged file.
//!
//! ## Sequence
//!
//! 1. Remove the existing side-file, if any. Failure is logged only; the
//!    side-file fetch that follows overwrites it anyway.
//! 2. Remove the existing published file. Failure aborts before anything is
//!    moved, leaving the old file intact.
//! 3. Move the staged file into place with a rename.
//!
//! If step 3 fails after step 2 succeeded, no published file remains until
//! the next successful sync.
//!
//! When staging and publishing live on different filesystems the rename is
//! replaced by a copy into `<published>.sync.tmp` beside the target, an
//! fsync, and a rename of that file over the target.

use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    /// The previous published file is still in place.
    #[error("could not delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The previous published file may already be gone.
    #[error("could not move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// No published file existed.
    Created,
    /// An older published file was replaced.
    Replaced,
}

pub fn publish(
    staged: &Path,
    published: &Path,
    side_file: &Path,
) -> Result<PublishOutcome, PublishError> {
    match fs::remove_file(side_file) {
        Ok(()) => tracing::debug!(path = %side_file.display(), "removed old side-file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::error!(
            path = %side_file.display(),
            error = %e,
            "error deleting side-file"
        ),
    }

    let outcome = match fs::remove_file(published) {
        Ok(()) => {
            tracing::info!(path = %published.display(), "deleted old file");
            PublishOutcome::Replaced
        }
        Err(e) if e.kind() == ErrorKind::NotFound => PublishOutcome::Created,
        Err(source) => {
            tracing::error!(
                path = %published.display(),
                error = %source,
                "error deleting published file"
            );
            return Err(PublishError::Delete {
                path: published.to_path_buf(),
                source,
            });
        }
    };

    if let Err(source) = move_file(staged, published) {
        tracing::error!(
            from = %staged.display(),
            to = %published.display(),
            error = %source,
            "error moving file"
        );
        return Err(PublishError::Move {
            from: staged.to_path_buf(),
            to: published.to_path_buf(),
            source,
        });
    }

    tracing::info!(path = %published.display(), "renamed file to new path");
    Ok(outcome)
}

/// Rename `from` to `to`, copying across filesystems when necessary.
pub(crate) fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() == ErrorKind::CrossesDevices => copy_into_place(from, to),
        other => other,
    }
}

fn copy_into_place(from: &Path, to: &Path) -> io::Result<()> {
    let tmp = sync_tmp_path(to);
    let copy = || -> io::Result<()> {
        fs::copy(from, &tmp)?;
        File::open(&tmp)?.sync_all()?;
        fs::rename(&tmp, to)
    };
    if let Err(e) = copy() {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    // The target is already replaced; a leftover staged file is harmless.
    if let Err(e) = fs::remove_file(from) {
        tracing::warn!(path = %from.display(), error = %e, "could not remove staged file");
    }
    Ok(())
}

fn sync_tmp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".sync.tmp");
    PathBuf::from(name)
}
