//! CLI integration tests

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command bound to an isolated data directory with a cheap KDF profile
fn contactbook(data_dir: &Path) -> Command {
    fs::create_dir_all(data_dir).unwrap();
    let config = data_dir.join("config.json");
    if !config.exists() {
        fs::write(
            &config,
            r#"{"encryption":{"kdf":{"memoryKib":64,"iterations":1,"parallelism":1}}}"#,
        )
        .unwrap();
    }

    let mut cmd = Command::cargo_bin("contactbook").unwrap();
    cmd.env("CONTACTBOOK_DATA_DIR", data_dir)
        .env("CONTACTBOOK_PLATFORM", "desktop")
        .env_remove("CONTACTBOOK_BACKUP_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn only_file(dir: &Path) -> PathBuf {
    let entries: Vec<_> = fs::read_dir(dir).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(entries.len(), 1, "expected one file in {}", dir.display());
    entries.into_iter().next().unwrap()
}

#[test]
fn help_lists_commands() {
    let temp = TempDir::new().unwrap();
    contactbook(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("contact"));
}

#[test]
fn add_and_list_contacts() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");

    contactbook(&data)
        .args(["contact", "add", "Ada Lovelace", "--email", "ada@example.com", "--tag", "math"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created contact: con-"));

    contactbook(&data)
        .args(["contact", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada Lovelace"))
        .stdout(predicate::str::contains("ada@example.com"));

    contactbook(&data)
        .args(["note", "add", "Ada Lovelace", "Engine", "--content", "Bernoulli numbers"])
        .assert()
        .success();

    contactbook(&data)
        .args(["contact", "show", "Ada Lovelace"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 notes, 0 links, 0 attachments"));
}

#[test]
fn encrypted_backup_round_trip() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let target = temp.path().join("target");
    let out = temp.path().join("out");

    contactbook(&source)
        .args(["contact", "add", "Grace Hopper"])
        .assert()
        .success();

    let attachment = temp.path().join("manual.txt");
    fs::write(&attachment, b"A-0 System").unwrap();
    contactbook(&source)
        .args(["attachment", "add", "Grace Hopper"])
        .arg(&attachment)
        .assert()
        .success();

    contactbook(&source)
        .env("CONTACTBOOK_BACKUP_PASSWORD", "p@ss")
        .args(["backup", "export", "--encrypt", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup saved:"));

    let backup = only_file(&out);
    let raw = fs::read_to_string(&backup).unwrap();
    assert!(raw.contains("\"encrypted\": true"));
    assert!(!raw.contains("Grace"));

    contactbook(&target)
        .env("CONTACTBOOK_BACKUP_PASSWORD", "wrong")
        .args(["backup", "import", "--force"])
        .arg(&backup)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Decryption failed"));

    contactbook(&target)
        .env("CONTACTBOOK_BACKUP_PASSWORD", "p@ss")
        .args(["backup", "import", "--force"])
        .arg(&backup)
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored: 1 contacts, 0 notes, 0 links, 1 attachments"));

    let extracted = temp.path().join("extracted.txt");
    contactbook(&target)
        .args(["attachment", "extract", "Grace Hopper", "manual.txt", "--output"])
        .arg(&extracted)
        .assert()
        .success();
    assert_eq!(fs::read(&extracted).unwrap(), b"A-0 System");
}

#[test]
fn inspect_without_password() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    let out = temp.path().join("out");

    contactbook(&data)
        .args(["contact", "add", "Linus"])
        .assert()
        .success();
    contactbook(&data)
        .env("CONTACTBOOK_BACKUP_PASSWORD", "secret")
        .args(["backup", "export", "--encrypt", "--output"])
        .arg(&out)
        .assert()
        .success();

    contactbook(&data)
        .args(["backup", "inspect"])
        .arg(only_file(&out))
        .assert()
        .success()
        .stdout(predicate::str::contains("Encrypted: Yes"))
        .stdout(predicate::str::contains("password required"));
}

#[test]
fn tabular_cannot_be_encrypted() {
    let temp = TempDir::new().unwrap();
    contactbook(temp.path())
        .env("CONTACTBOOK_BACKUP_PASSWORD", "secret")
        .args(["backup", "export", "--format", "tabular", "--encrypt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be encrypted"));
}

#[test]
fn tabular_export_lands_in_documents() {
    let temp = TempDir::new().unwrap();
    contactbook(temp.path())
        .args(["contact", "add", "Margaret Hamilton"])
        .assert()
        .success();

    contactbook(temp.path())
        .args(["backup", "export", "--format", "tabular"])
        .assert()
        .success()
        .stdout(predicate::str::contains("documents directory"))
        .stdout(predicate::str::contains("not complete"));

    let file = only_file(&temp.path().join("Documents"));
    assert_eq!(file.extension().unwrap(), "zip");
}

#[test]
fn unknown_platform_is_rejected() {
    let temp = TempDir::new().unwrap();
    contactbook(temp.path())
        .env("CONTACTBOOK_PLATFORM", "toaster")
        .args(["backup", "export"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown platform"));
}
