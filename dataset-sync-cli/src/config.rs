//! Environment-driven configuration.
//!
//! | variable                         | default                     |
//! |----------------------------------|-----------------------------|
//! | `DATASET_SYNC_MOUNT_DIR`         | `/mnt`                      |
//! | `DATASET_SYNC_TEMP_DIR`          | `var`                       |
//! | `DATASET_SYNC_SPECIFICATION_URL` | dataset specification CSV   |
//! | `DATASET_SYNC_FINGERPRINT`       | `dbhash` (or `native`)      |
//! | `DATASET_SYNC_LOCAL_STORE`       | unset: S3                   |

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};

use dataset_sync::specification::DEFAULT_SPECIFICATION_URL;
use dataset_sync_core::layout::{DEFAULT_MOUNT_DIR, DEFAULT_TEMP_DIR};
use dataset_sync_core::SyncLayout;

pub const MOUNT_DIR_VAR: &str = "DATASET_SYNC_MOUNT_DIR";
pub const TEMP_DIR_VAR: &str = "DATASET_SYNC_TEMP_DIR";
pub const SPECIFICATION_URL_VAR: &str = "DATASET_SYNC_SPECIFICATION_URL";
pub const FINGERPRINT_VAR: &str = "DATASET_SYNC_FINGERPRINT";
pub const LOCAL_STORE_VAR: &str = "DATASET_SYNC_LOCAL_STORE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FingerprintMode {
    /// SQLite's `dbhash` utility on `PATH`.
    #[default]
    DbHash,
    /// In-process logical content hash.
    Native,
}

impl FromStr for FingerprintMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dbhash" => Ok(Self::DbHash),
            "native" => Ok(Self::Native),
            other => Err(format!(
                "unknown fingerprint mode '{other}'; expected: dbhash, native"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub mount_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub specification_url: String,
    pub fingerprint: FingerprintMode,
    /// Root of a `{root}/{bucket}/{key}` tree used instead of S3.
    pub local_store: Option<PathBuf>,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let fingerprint = match get(FINGERPRINT_VAR) {
            Some(raw) => match raw.parse::<FingerprintMode>() {
                Ok(mode) => mode,
                Err(msg) => bail!("{FINGERPRINT_VAR}: {msg}"),
            },
            None => FingerprintMode::default(),
        };

        Ok(Self {
            mount_dir: get(MOUNT_DIR_VAR)
                .unwrap_or_else(|| DEFAULT_MOUNT_DIR.to_string())
                .into(),
            temp_dir: get(TEMP_DIR_VAR)
                .unwrap_or_else(|| DEFAULT_TEMP_DIR.to_string())
                .into(),
            specification_url: get(SPECIFICATION_URL_VAR)
                .unwrap_or_else(|| DEFAULT_SPECIFICATION_URL.to_string()),
            fingerprint,
            local_store: get(LOCAL_STORE_VAR).map(PathBuf::from),
        })
    }

    pub fn layout(&self) -> SyncLayout {
        SyncLayout::new(&self.mount_dir, &self.temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_the_deployed_layout() {
        let config = SyncConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.mount_dir, PathBuf::from("/mnt"));
        assert_eq!(config.temp_dir, PathBuf::from("var"));
        assert_eq!(config.specification_url, DEFAULT_SPECIFICATION_URL);
        assert_eq!(config.fingerprint, FingerprintMode::DbHash);
        assert_eq!(config.local_store, None);
    }

    #[test]
    fn variables_override_defaults() {
        let config = SyncConfig::from_lookup(lookup(&[
            (MOUNT_DIR_VAR, "/efs"),
            (TEMP_DIR_VAR, "/scratch"),
            (SPECIFICATION_URL_VAR, "http://localhost/dataset.csv"),
            (FINGERPRINT_VAR, "Native"),
            (LOCAL_STORE_VAR, "/data/store"),
        ]))
        .unwrap();

        assert_eq!(
            config.layout().published_path("tree.sqlite3"),
            PathBuf::from("/efs/datasets/tree.sqlite3")
        );
        assert_eq!(
            config.layout().staged_path("tree.sqlite3"),
            PathBuf::from("/scratch/tree.sqlite3")
        );
        assert_eq!(config.specification_url, "http://localhost/dataset.csv");
        assert_eq!(config.fingerprint, FingerprintMode::Native);
        assert_eq!(config.local_store, Some(PathBuf::from("/data/store")));
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let config = SyncConfig::from_lookup(lookup(&[(MOUNT_DIR_VAR, "")])).unwrap();
        assert_eq!(config.mount_dir, PathBuf::from("/mnt"));
    }

    #[test]
    fn unknown_fingerprint_mode_is_rejected() {
        let err = SyncConfig::from_lookup(lookup(&[(FINGERPRINT_VAR, "md5")])).unwrap_err();
        assert!(err.to_string().contains(FINGERPRINT_VAR));
    }
}
