use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("markers.json");

    let mut cmd = Command::new(cargo_bin!("carepay"));
    cmd.env_remove("RUST_LOG")
        .arg("--store-path")
        .arg(&store)
        .arg("--db-path")
        .arg(dir.path().join("some_db"))
        .arg("markers");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("[]"))
        .stderr(predicate::str::contains(
            "'storage-rocksdb' feature is not enabled. Falling back to the JSON marker file.",
        ));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = Command::new(cargo_bin!("carepay"));
    cmd.env_remove("RUST_LOG")
        .arg("--db-path")
        .arg(&db_path)
        .arg("markers");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARN").not());
}
