#[path = "../src/backup.rs"]
mod backup;

use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::ZipWriter;

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn write_bundle(path: &Path, manifest: serde_json::Value, db_bytes: &[u8]) {
    let f = File::create(path).expect("create bundle");
    let mut w = ZipWriter::new(f);
    let opts = FileOptions::default();
    w.start_file("manifest.json", opts).expect("manifest entry");
    w.write_all(manifest.to_string().as_bytes())
        .expect("write manifest");
    w.start_file("db/sims.sqlite3", opts).expect("db entry");
    w.write_all(db_bytes).expect("write db");
    w.finish().expect("finish zip");
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("sims-backup-src");
    let workspace2 = temp_dir("sims-backup-dst");
    let out_dir = temp_dir("sims-backup-out");

    let db_src = workspace.join("sims.sqlite3");
    let bytes = b"sqlite-test-payload";
    std::fs::write(&db_src, bytes).expect("write source db");

    let bundle_path = out_dir.join("workspace.simsbackup.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT_V1);
    assert_eq!(export.entry_count, 3);
    assert_eq!(export.db_sha256, sha256_hex(bytes));

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT_V1));
    assert!(manifest.contains(&export.db_sha256));
    archive
        .by_name("db/sims.sqlite3")
        .expect("database entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT_V1);

    let db_dst = workspace2.join("sims.sqlite3");
    let restored = std::fs::read(&db_dst).expect("read restored db");
    assert_eq!(restored, bytes);

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn tampered_database_entry_is_rejected() {
    let out_dir = temp_dir("sims-backup-tampered");
    let workspace = temp_dir("sims-backup-tampered-dst");

    let bundle = out_dir.join("tampered.simsbackup.zip");
    let manifest = json!({
        "format": backup::BUNDLE_FORMAT_V1,
        "version": 1,
        "dbSha256": sha256_hex(b"the-original-bytes"),
    });
    write_bundle(&bundle, manifest, b"swapped-in-bytes");

    let err = backup::import_workspace_bundle(&bundle, &workspace)
        .expect_err("tampered bundle must fail");
    assert!(
        err.to_string().contains("checksum mismatch"),
        "unexpected error: {}",
        err
    );
    assert!(!workspace.join("sims.sqlite3").exists());

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn manifest_without_checksum_is_rejected() {
    let out_dir = temp_dir("sims-backup-nosha");
    let workspace = temp_dir("sims-backup-nosha-dst");

    let bundle = out_dir.join("nosha.simsbackup.zip");
    let manifest = json!({
        "format": backup::BUNDLE_FORMAT_V1,
        "version": 1,
    });
    write_bundle(&bundle, manifest, b"whatever");

    let err = backup::import_workspace_bundle(&bundle, &workspace)
        .expect_err("bundle without digest must fail");
    assert!(
        err.to_string().contains("dbSha256"),
        "unexpected error: {}",
        err
    );

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unknown_bundle_format_is_rejected() {
    let out_dir = temp_dir("sims-backup-format");
    let workspace = temp_dir("sims-backup-format-dst");

    let bundle = out_dir.join("other.simsbackup.zip");
    let payload = b"future-bytes";
    let manifest = json!({
        "format": "sims-workspace-v99",
        "version": 99,
        "dbSha256": sha256_hex(payload),
    });
    write_bundle(&bundle, manifest, payload);

    let err = backup::import_workspace_bundle(&bundle, &workspace)
        .expect_err("unknown format must fail");
    assert!(
        err.to_string().contains("unsupported bundle format"),
        "unexpected error: {}",
        err
    );

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn raw_sqlite_import_is_supported() {
    let out_dir = temp_dir("sims-backup-raw");
    let workspace = temp_dir("sims-backup-raw-dst");

    let raw_file = out_dir.join("plain.sqlite3");
    let bytes = b"raw-sqlite-copy";
    std::fs::write(&raw_file, bytes).expect("write raw sqlite file");

    let import =
        backup::import_workspace_bundle(&raw_file, &workspace).expect("import raw sqlite");
    assert_eq!(import.bundle_format_detected, "raw-sqlite3");

    let restored = std::fs::read(workspace.join("sims.sqlite3")).expect("read restored sqlite");
    assert_eq!(restored, bytes);

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}
