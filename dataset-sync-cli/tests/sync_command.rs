//! Runs the `dataset-sync` binary against a local object store.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use rusqlite::Connection;
use tempfile::TempDir;

const BUCKET: &str = "testing_bucket";
const BUILDER_KEY: &str = "entity-builder/dataset/entity.sqlite3";
// Nothing listens on the discard port; the fetch fails fast.
const UNREACHABLE_SPECIFICATION: &str = "http://127.0.0.1:9/dataset.csv";

struct Env {
    root: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            root: TempDir::new().expect("root"),
        }
    }

    fn store(&self) -> PathBuf {
        self.root.path().join("store")
    }

    fn mnt(&self) -> PathBuf {
        self.root.path().join("mnt")
    }

    fn upload_dataset(&self, key: &str, rows: &[&str]) {
        let path = self.store().join(BUCKET).join(key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let _ = fs::remove_file(&path);
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE entity (entity INTEGER PRIMARY KEY, name TEXT);")
            .unwrap();
        for row in rows {
            conn.execute("INSERT INTO entity (name) VALUES (?1)", [row])
                .unwrap();
        }
    }

    fn cmd(&self, key: &str) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dataset-sync"));
        cmd.env("DATASET_SYNC_MOUNT_DIR", self.mnt())
            .env("DATASET_SYNC_TEMP_DIR", self.root.path().join("var"))
            .env("DATASET_SYNC_LOCAL_STORE", self.store())
            .env("DATASET_SYNC_SPECIFICATION_URL", UNREACHABLE_SPECIFICATION)
            .env("DATASET_SYNC_FINGERPRINT", "native")
            .env("RUST_LOG", "warn")
            .args(["--key", key, "--bucket", BUCKET]);
        cmd
    }
}

fn exists(path: &Path) -> bool {
    path.try_exists().unwrap()
}

#[test]
fn builder_key_is_published_then_skipped_when_unchanged() {
    let env = Env::new();
    env.upload_dataset(BUILDER_KEY, &["one", "two"]);

    env.cmd(BUILDER_KEY)
        .assert()
        .success()
        .stdout(contains("published entity.sqlite3"));

    let datasets = env.mnt().join("datasets");
    assert!(exists(&datasets.join("entity.sqlite3")));
    assert!(exists(&datasets.join("hashes").join("entity.json")));
    assert!(exists(&datasets.join("inspect-data-all.json")));

    env.cmd(BUILDER_KEY)
        .assert()
        .success()
        .stdout(contains("skipped entity.sqlite3: unchanged"));
}

#[test]
fn key_outside_specifications_is_skipped_without_side_effects() {
    let env = Env::new();
    env.upload_dataset("tree-collection/dataset/tree.sqlite3", &["oak"]);

    env.cmd("tree-collection/dataset/tree.sqlite3")
        .assert()
        .success()
        .stdout(contains("skipped tree.sqlite3: not managed"));

    assert!(!exists(&env.mnt().join("datasets")));
}

#[test]
fn missing_object_exits_with_failure_status() {
    let env = Env::new();

    env.cmd(BUILDER_KEY)
        .assert()
        .code(1)
        .stderr(contains("sync failed"));

    assert!(!exists(&env.mnt().join("datasets").join("entity.sqlite3")));
}

#[test]
fn missing_bucket_is_a_usage_error() {
    Command::new(assert_cmd::cargo::cargo_bin!("dataset-sync"))
        .args(["--key", BUILDER_KEY])
        .assert()
        .code(2)
        .stderr(contains("--bucket"));
}

#[test]
fn invalid_fingerprint_mode_fails_before_syncing() {
    let env = Env::new();
    env.upload_dataset(BUILDER_KEY, &["one"]);

    env.cmd(BUILDER_KEY)
        .env("DATASET_SYNC_FINGERPRINT", "md5")
        .assert()
        .code(1)
        .stderr(contains("DATASET_SYNC_FINGERPRINT"));

    assert!(!exists(&env.mnt().join("datasets")));
}
