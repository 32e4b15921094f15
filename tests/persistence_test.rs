#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

fn place_order(db_path: &std::path::Path, item: &str) -> String {
    let mut cmd = Command::new(cargo_bin!("shopfront"));
    cmd.env_remove("STRIPE_API_KEY")
        .env_remove("FIXER_API_KEY")
        .arg("--items")
        .arg("tests/fixtures/items.csv")
        .args(["--item", item])
        .arg("--db-path")
        .arg(db_path);

    let output = cmd.output().expect("Failed to execute command");
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_rocksdb_order_ids_survive_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let first = place_order(&db_path, "1");
    assert!(first.contains("\n1,cs_test_1,"));

    // Each run gets a fresh gateway, but order ids continue from the database
    let second = place_order(&db_path, "2");
    assert!(second.contains("\n2,cs_test_1,"));
    assert!(second.contains(",5.5,usd,unpaid"));
}
