//! Object store collaborator: download one object to a local path.
//!
//! Implementations write into `<destination>.part` and rename on success, so
//! a failed download never leaves a partial file at `destination`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use dataset_sync_core::ObjectKey;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object s3://{bucket}/{key} does not exist")]
    NotFound { bucket: String, key: String },

    #[error("transport error fetching s3://{bucket}/{key}: {message}")]
    Transport {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ObjectStoreError {
    ObjectStoreError::Io {
        path: path.into(),
        source,
    }
}

/// Download-by-key access to an object store.
pub trait ObjectStore {
    /// Copy `bucket`/`key` to `destination`, returning the number of bytes
    /// written.
    fn download(
        &self,
        bucket: &str,
        key: &ObjectKey,
        destination: &Path,
    ) -> Result<u64, ObjectStoreError>;
}

/// `<destination>.part`
fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Run `fill` against a `.part` sibling of `destination`, then move it into
/// place. The `.part` file is removed on failure.
fn download_via_part<F>(destination: &Path, fill: F) -> Result<u64, ObjectStoreError>
where
    F: FnOnce(&Path) -> Result<u64, ObjectStoreError>,
{
    let part = part_path(destination);
    let written = match fill(&part) {
        Ok(written) => written,
        Err(err) => {
            let _ = fs::remove_file(&part);
            return Err(err);
        }
    };
    if let Err(e) = fs::rename(&part, destination) {
        let _ = fs::remove_file(&part);
        return Err(io_err(destination, e));
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Local directory store
// ---------------------------------------------------------------------------

/// Store backed by a directory tree laid out as `{root}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn object_path(&self, bucket: &str, key: &ObjectKey) -> PathBuf {
        self.root.join(bucket).join(key.as_str())
    }
}

impl ObjectStore for LocalObjectStore {
    fn download(
        &self,
        bucket: &str,
        key: &ObjectKey,
        destination: &Path,
    ) -> Result<u64, ObjectStoreError> {
        let source = self.object_path(bucket, key);
        download_via_part(destination, |part| {
            fs::copy(&source, part).map_err(|e| match e.kind() {
                ErrorKind::NotFound if !source.exists() => ObjectStoreError::NotFound {
                    bucket: bucket.to_owned(),
                    key: key.to_string(),
                },
                _ => io_err(part, e),
            })
        })
    }
}

// ---------------------------------------------------------------------------
// S3
// ---------------------------------------------------------------------------

/// S3 store using the default AWS credential chain.
///
/// Owns a current-thread runtime so downloads block the caller.
pub struct S3ObjectStore {
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl S3ObjectStore {
    pub fn from_env() -> Result<Self, ObjectStoreError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ObjectStoreError::Runtime)?;
        let config = runtime.block_on(aws_config::load_defaults(BehaviorVersion::latest()));
        Ok(Self {
            client: Client::new(&config),
            runtime,
        })
    }
}

impl ObjectStore for S3ObjectStore {
    fn download(
        &self,
        bucket: &str,
        key: &ObjectKey,
        destination: &Path,
    ) -> Result<u64, ObjectStoreError> {
        let transport = |message: String| ObjectStoreError::Transport {
            bucket: bucket.to_owned(),
            key: key.to_string(),
            message,
        };

        download_via_part(destination, |part| {
            self.runtime.block_on(async {
                let response = self
                    .client
                    .get_object()
                    .bucket(bucket)
                    .key(key.as_str())
                    .send()
                    .await
                    .map_err(|err| {
                        if err
                            .as_service_error()
                            .is_some_and(|service| service.is_no_such_key())
                        {
                            ObjectStoreError::NotFound {
                                bucket: bucket.to_owned(),
                                key: key.to_string(),
                            }
                        } else {
                            transport(DisplayErrorContext(&err).to_string())
                        }
                    })?;

                let mut body = response.body;
                let mut file = tokio::fs::File::create(part)
                    .await
                    .map_err(|e| io_err(part, e))?;
                let mut written = 0u64;
                while let Some(chunk) = body.next().await {
                    let chunk = chunk.map_err(|err| transport(err.to_string()))?;
                    file.write_all(&chunk).await.map_err(|e| io_err(part, e))?;
                    written += chunk.len() as u64;
                }
                file.sync_all().await.map_err(|e| io_err(part, e))?;
                tracing::debug!(bytes = written, "downloaded object body");
                Ok::<u64, ObjectStoreError>(written)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed(root: &Path, bucket: &str, key: &str, content: &[u8]) {
        let path = root.join(bucket).join(key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn local_store_copies_nested_key() {
        let store_root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        seed(store_root.path(), "bucket", "a-collection/dataset/a.sqlite3", b"data");

        let store = LocalObjectStore::new(store_root.path());
        let dest = out.path().join("a.sqlite3");
        let written = store
            .download("bucket", &ObjectKey::from("a-collection/dataset/a.sqlite3"), &dest)
            .unwrap();

        assert_eq!(written, 4);
        assert_eq!(fs::read(&dest).unwrap(), b"data");
        assert!(!part_path(&dest).exists(), ".part must be renamed away");
    }

    #[test]
    fn missing_object_is_not_found_and_leaves_nothing() {
        let store_root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let store = LocalObjectStore::new(store_root.path());
        let dest = out.path().join("missing.sqlite3");

        let err = store
            .download("bucket", &ObjectKey::from("missing.sqlite3"), &dest)
            .unwrap_err();

        assert!(matches!(err, ObjectStoreError::NotFound { .. }), "got: {err}");
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn download_overwrites_existing_destination() {
        let store_root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        seed(store_root.path(), "bucket", "a.sqlite3.json", b"{\"new\":1}");
        let dest = out.path().join("a.sqlite3.json");
        fs::write(&dest, b"{\"old\":1}").unwrap();

        LocalObjectStore::new(store_root.path())
            .download("bucket", &ObjectKey::from("a.sqlite3.json"), &dest)
            .unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "{\"new\":1}");
    }

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/tmp/x.sqlite3")),
            PathBuf::from("/tmp/x.sqlite3.part")
        );
    }
}
