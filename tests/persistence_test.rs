#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

fn transfer(db_path: &std::path::Path, accounts: Option<&std::path::Path>) -> std::process::Output {
    let mut cmd = Command::new(cargo_bin!("transfer-engine"));
    cmd.arg("--db-path").arg(db_path);
    if let Some(accounts) = accounts {
        cmd.arg("--accounts").arg(accounts);
    }
    cmd.args(["transfer", "--from", "1", "--to", "2", "--amount", "30", "--currency", "RUB"]);
    cmd.output().expect("Failed to execute command")
}

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: seed accounts and transfer once
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "id,currency,balance").unwrap();
    writeln!(csv, "1,RUB,100").unwrap();
    writeln!(csv, "2,RUB,0").unwrap();

    let output1 = transfer(&db_path, Some(csv.path()));
    assert!(output1.status.success());
    assert_eq!(String::from_utf8_lossy(&output1.stdout), "order 1\n");

    // 2. Second run: no accounts file, balances and order sequence come from disk
    let output2 = transfer(&db_path, None);
    assert!(output2.status.success());
    assert_eq!(String::from_utf8_lossy(&output2.stdout), "order 2\n");

    // 3. Third run: 40 left, so another 30 still fits; a fourth does not
    assert!(transfer(&db_path, None).status.success());
    let output4 = transfer(&db_path, None);
    assert!(!output4.status.success());
    assert!(
        String::from_utf8_lossy(&output4.stderr)
            .contains("insufficient funds or account not found for sender: 1")
    );
}
